use crate::app::App;
use crate::mpris::MprisHandle;

pub fn update_mpris(mpris: &MprisHandle, app: &App) {
    mpris.set_track_metadata(app.current, app.current_track());
    mpris.set_playback(app.state);
    mpris.set_position(app.position);
}

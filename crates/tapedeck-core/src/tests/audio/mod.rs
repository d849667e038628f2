mod capture;
mod playback;

mod live_update;
mod registration;

pub mod contact;
pub mod deferred;
pub mod physics;
pub mod scene;
pub mod time;
pub mod units;

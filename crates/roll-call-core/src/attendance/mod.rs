pub mod policy;

pub use policy::{check_window, classify_arrival, decide, window_status, Rejection, WindowStatus};

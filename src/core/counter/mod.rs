mod consecutive;
mod rolling_window;

pub(crate) use consecutive::*;
pub(crate) use rolling_window::*;

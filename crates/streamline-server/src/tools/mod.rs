//! Demo capabilities served by the binary.

mod calculate;
mod stream_data;
mod weather;

pub use calculate::Calculate;
pub use stream_data::StreamData;
pub use weather::GetWeather;

mod chart;
mod driver;
mod params;
mod path;
mod plan;
mod result;
mod trial;
mod utils;

pub use chart::*;
pub use driver::*;
pub use params::*;
pub use path::*;
pub use plan::*;
pub use result::*;
pub use trial::*;
pub use utils::*;

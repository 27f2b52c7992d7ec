mod history;
mod money;
mod pricing;
mod sale;

pub use history::*;
pub use money::*;
pub use pricing::*;
pub use sale::*;

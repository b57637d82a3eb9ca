//
//  mod.rs
//  Cascade
//
//  Created by hak (tharun)
//

pub mod summary;

pub use summary::{FactSummary, ParseError};

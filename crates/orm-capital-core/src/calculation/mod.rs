//! Calculation engines and unified dispatcher (§4.4, C4/C5).

pub mod bia;
pub mod dispatch;
pub mod sma;
pub mod tsa;

pub use bia::{BiaInput, BiaResult};
pub use dispatch::{compare, dispatch, validate_bundle, DispatchResult, MethodInput, MethodResult};
pub use sma::{SmaInput, SmaResult};
pub use tsa::{TsaInput, TsaResult};

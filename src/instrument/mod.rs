/// Instrument access: the transport trait and the retrying reader on top of it
pub mod modbus;
pub mod reader;

pub use modbus::ModbusInstrument;
pub use reader::Reader;

use crate::error::InstrumentError;

/// A temperature/humidity instrument. Reads may fail at any time;
/// `reconnect` re-establishes the transport.
#[allow(async_fn_in_trait)]
pub trait Instrument {
    async fn read_temperature(&mut self) -> Result<f64, InstrumentError>;
    async fn read_humidity(&mut self) -> Result<f64, InstrumentError>;
    async fn reconnect(&mut self) -> Result<(), InstrumentError>;
}

/// Modbus RTU instrument over a serial port
use log::{debug, error, info};
use tokio_modbus::client::{rtu, Context, Reader as _};
use tokio_modbus::Slave;
use tokio_serial::SerialStream;

use crate::config::InstrumentSettings;
use crate::error::InstrumentError;
use crate::instrument::Instrument;

pub struct ModbusInstrument {
    settings: InstrumentSettings,
    context: Option<Context>,
}

impl ModbusInstrument {
    /// Open the serial port and attach to the configured slave. A port that
    /// cannot be opened yet is retried by the next failed read.
    pub fn connect(settings: InstrumentSettings) -> Self {
        let context = match Self::open(&settings) {
            Ok(context) => {
                info!(
                    "Connected to instrument on {} (slave {})",
                    settings.port, settings.slave
                );
                Some(context)
            }
            Err(e) => {
                error!("Failed to connect to instrument on {}: {}", settings.port, e);
                None
            }
        };
        Self { settings, context }
    }

    fn open(settings: &InstrumentSettings) -> Result<Context, InstrumentError> {
        let builder = tokio_serial::new(&settings.port, settings.baud);
        let stream = SerialStream::open(&builder)?;
        Ok(rtu::attach_slave(stream, Slave(settings.slave)))
    }

    async fn read_register(&mut self, address: u16) -> Result<f64, InstrumentError> {
        let context = self.context.as_mut().ok_or(InstrumentError::NotConnected)?;
        let registers = context
            .read_holding_registers(address, 1)
            .await
            .map_err(|e| InstrumentError::Transport(e.to_string()))?
            .map_err(|code| InstrumentError::Exception(format!("{:?}", code)))?;
        let raw = *registers.first().ok_or(InstrumentError::EmptyResponse)?;
        // Registers hold signed fixed-point values
        let value = raw as i16 as f64 / self.settings.scale;
        debug!("Register {} = {} -> {:.2}", address, raw, value);
        Ok(value)
    }
}

impl Instrument for ModbusInstrument {
    async fn read_temperature(&mut self) -> Result<f64, InstrumentError> {
        self.read_register(self.settings.temperature_register).await
    }

    async fn read_humidity(&mut self) -> Result<f64, InstrumentError> {
        self.read_register(self.settings.humidity_register).await
    }

    async fn reconnect(&mut self) -> Result<(), InstrumentError> {
        // Drop the old port before reopening it
        self.context = None;
        self.context = Some(Self::open(&self.settings)?);
        info!("Reconnected to instrument on {}", self.settings.port);
        Ok(())
    }
}

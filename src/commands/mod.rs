// commands/mod.rs
//! Operations accepted by the device worker.
//!
//! Each variant carries the channel its result is delivered on, so every
//! caller gets its own answer even though execution is strictly serial.

use tokio::sync::oneshot;

use crate::colour::Brightness;
use crate::devices::{DeviceSnapshot, Freshness, Outcome, ReconciliationEngine};
use crate::error::StripError;

pub type Reply<T> = oneshot::Sender<Result<Outcome<T>, StripError>>;

#[derive(Debug)]
pub enum Operation {
    GetPower(Reply<bool>),
    SetPower(bool, Reply<()>),
    GetHue(Reply<f64>),
    SetHue(f64, Reply<()>),
    GetSaturation(Reply<f64>),
    SetSaturation(f64, Reply<()>),
    GetBrightness(Reply<u8>),
    SetBrightness(Brightness, Reply<()>),
    Reconcile(Reply<()>),
    Snapshot(Reply<DeviceSnapshot>),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::GetPower(_) => "get_power",
            Operation::SetPower(..) => "set_power",
            Operation::GetHue(_) => "get_hue",
            Operation::SetHue(..) => "set_hue",
            Operation::GetSaturation(_) => "get_saturation",
            Operation::SetSaturation(..) => "set_saturation",
            Operation::GetBrightness(_) => "get_brightness",
            Operation::SetBrightness(..) => "set_brightness",
            Operation::Reconcile(_) => "reconcile",
            Operation::Snapshot(_) => "snapshot",
        }
    }

    /// Run against the engine and answer the caller. A caller that stopped
    /// waiting is not an error.
    pub async fn execute(self, engine: &mut ReconciliationEngine) {
        match self {
            Operation::GetPower(reply) => {
                let _ = reply.send(Ok(engine.get_power().await));
            }
            Operation::SetPower(on, reply) => {
                let _ = reply.send(Ok(engine.set_power(on).await));
            }
            Operation::GetHue(reply) => {
                let _ = reply.send(Ok(engine.get_hue().await));
            }
            Operation::SetHue(hue, reply) => {
                let _ = reply.send(engine.set_hue(hue).await);
            }
            Operation::GetSaturation(reply) => {
                let _ = reply.send(Ok(engine.get_saturation().await));
            }
            Operation::SetSaturation(saturation, reply) => {
                let _ = reply.send(engine.set_saturation(saturation).await);
            }
            Operation::GetBrightness(reply) => {
                let _ = reply.send(Ok(engine.get_brightness()));
            }
            Operation::SetBrightness(brightness, reply) => {
                let _ = reply.send(Ok(engine.set_brightness(brightness).await));
            }
            Operation::Reconcile(reply) => {
                let _ = reply.send(Ok(engine.reconcile().await));
            }
            Operation::Snapshot(reply) => {
                let _ = reply.send(Ok(Outcome::new(engine.snapshot(), Freshness::Verified)));
            }
        }
    }
}

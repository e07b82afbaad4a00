//! End-to-end tests over in-memory byte pipes
//!
//! A `tokio::io::duplex` pair stands in for the USB serial line: the test
//! plays the meter firmware on one end, the link reads the other.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use meterlink::transports::IoPort;
use meterlink::{
    Command, DevicePort, DeviceSelector, DriverState, LinkConfig, MeterLink, Result,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

/// Selector handing out queued duplex ports
#[derive(Default)]
struct PipeSelector {
    ports: Mutex<Vec<DuplexStream>>,
}

impl PipeSelector {
    fn with(hosts: Vec<DuplexStream>) -> Self {
        Self { ports: Mutex::new(hosts.into_iter().rev().collect()) }
    }
}

#[async_trait::async_trait]
impl DeviceSelector for PipeSelector {
    fn is_supported(&self) -> bool {
        true
    }

    async fn request_port(&self) -> Result<Option<Box<dyn DevicePort>>> {
        let next = self.ports.lock().unwrap().pop();
        Ok(next.map(|host| Box::new(IoPort::from_stream("duplex", host)) as Box<dyn DevicePort>))
    }
}

async fn within<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(2), future).await.expect("timed out")
}

#[tokio::test]
async fn meter_session_over_a_byte_pipe() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();
    let (mut device, host) = tokio::io::duplex(256);
    let link = MeterLink::new(Arc::new(PipeSelector::with(vec![host])), LinkConfig::default())?;
    let mut adc = Box::pin(link.adc_updates());
    let mut battery = Box::pin(link.battery_updates());

    assert!(link.select_device().await?);
    assert!(link.is_connected());

    // Host asks for a reading, firmware sees the command verbatim
    link.request(Command::Battery).await;
    let mut command = [0u8; 3];
    within(device.read_exact(&mut command)).await?;
    assert_eq!(&command, b"BAT");

    // Firmware answers in awkward pieces, with a junk line in between
    device.write_all(b"{\"path\":\"BAT\",").await?;
    device.write_all(b"\"value\":3.7}\n{garbage\n{\"path\":\"AD").await?;
    device
        .write_all(b"C\",\"value\":{\"voltages\":[1,2],\"rmsV\":0.5,\"rmsP\":0.1,\"dBSPL\":40}}\n")
        .await?;

    assert_eq!(within(battery.next()).await, Some(3.7));
    let reading = within(adc.next()).await.expect("ADC reading");
    assert_eq!(reading.voltages, vec![1.0, 2.0]);
    assert_eq!(reading.rms_v, 0.5);
    assert_eq!(reading.rms_p, 0.1);
    assert_eq!(reading.db_spl, 40.0);

    // Unplugging ends the read cycle
    drop(device);
    within(async {
        while link.driver_state() != DriverState::Closed {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(!link.is_connected());
    Ok(())
}

#[tokio::test]
async fn picking_a_new_meter_supersedes_the_old_one() -> anyhow::Result<()> {
    let (mut first, first_host) = tokio::io::duplex(256);
    let (mut second, second_host) = tokio::io::duplex(256);
    let selector = PipeSelector::with(vec![first_host, second_host]);
    let link = MeterLink::new(Arc::new(selector), LinkConfig::default())?;

    link.select_device().await?;
    first.write_all(b"{\"path\":\"BAT\",\"value\":3.1}\n").await?;
    let mut battery = Box::pin(link.battery_updates());
    assert_eq!(within(battery.next()).await, Some(3.1));

    link.select_device().await?;

    // Nothing from the first meter lands once the second is active
    let _ = first.write_all(b"{\"path\":\"BAT\",\"value\":0.1}\n").await;
    second.write_all(b"{\"path\":\"BAT\",\"value\":4.0}\n").await?;
    assert_eq!(within(battery.next()).await, Some(4.0));

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(link.latest_battery(), Some(4.0));
    Ok(())
}

#[tokio::test]
async fn split_utf8_in_unknown_message_does_not_break_framing() -> anyhow::Result<()> {
    let (mut device, host) = tokio::io::duplex(256);
    let link = MeterLink::detached(LinkConfig::default())?;
    link.attach(Box::new(IoPort::from_stream("duplex", host))).await?;
    let mut battery = Box::pin(link.battery_updates());

    let line = "{\"path\":\"NOTE\",\"value\":\"µPa\"}\n".as_bytes();
    let cut = line.iter().position(|&b| b == 0xC2).expect("multi-byte char") + 1;
    device.write_all(&line[..cut]).await?;
    device.flush().await?;
    tokio::time::sleep(Duration::from_millis(5)).await;
    device.write_all(&line[cut..]).await?;
    device.write_all(b"{\"path\":\"BAT\",\"value\":3.9}\n").await?;

    assert_eq!(within(battery.next()).await, Some(3.9));
    let stats = link.disconnect().await.expect("attached");
    assert_eq!(stats.unrecognized, 1);
    assert_eq!(stats.decode_failures, 0);
    Ok(())
}

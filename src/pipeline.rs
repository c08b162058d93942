//! Reconciliation-and-delivery cycle
//!
//! One cycle: open a device session, fetch identity, users, and punches
//! (always releasing the session), classify the day's punches, merge with
//! the persisted document, swap-save, then attempt delivery. Anything that
//! cannot be delivered immediately lands in the durable queue; anything that
//! cannot be fetched degrades to "no data this cycle" and the next trigger
//! retries.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{info, warn};

use crate::attendance::builder::{build_document, group_punches};
use crate::attendance::merger::merge;
use crate::attendance::store::DocumentStore;
use crate::db::queue::{PendingKind, PendingQueue};
use crate::device::validator::validate_identity;
use crate::device::{DeviceConnector, DeviceInfo, DeviceSession, DeviceUser, Punch};
use crate::scheduler::CycleRunner;
use crate::services::api_client::Transport;
use crate::Result;

/// Everything one device session yields.
struct DeviceSnapshot {
    device_name: String,
    serial_number: String,
    mac_address: String,
    network_params: HashMap<String, String>,
    users: Vec<DeviceUser>,
    punches: Vec<Punch>,
}

async fn fetch_snapshot<S: DeviceSession>(session: &mut S) -> Result<DeviceSnapshot> {
    Ok(DeviceSnapshot {
        device_name: session.device_name().await?,
        serial_number: session.serial_number().await?,
        mac_address: session.mac_address().await?,
        network_params: session.network_params().await?,
        users: session.users().await?,
        punches: session.punches().await?,
    })
}

/// The foreground pipeline: device in, merged document out.
pub struct AttendancePipeline<C, S> {
    connector: C,
    store: S,
    queue: PendingQueue,
    transport: Arc<dyn Transport>,
    device_info_sent: bool,
}

impl<C, S> AttendancePipeline<C, S>
where
    C: DeviceConnector,
    S: DocumentStore,
{
    pub fn new(connector: C, store: S, queue: PendingQueue, transport: Arc<dyn Transport>) -> Self {
        Self {
            connector,
            store,
            queue,
            transport,
            device_info_sent: false,
        }
    }

    /// Run one reconciliation-and-delivery cycle for `today`.
    pub async fn run_cycle(&mut self, today: NaiveDate) -> Result<()> {
        let mut session = self.connector.connect().await?;
        let fetched = fetch_snapshot(&mut session).await;
        // The device stays disabled until the session is released, so the
        // close runs before the fetch result is even inspected.
        if let Err(e) = session.close().await {
            warn!("failed to release device session: {e}");
        }
        let snapshot = fetched?;

        let info = validate_identity(
            &snapshot.device_name,
            &snapshot.serial_number,
            &snapshot.mac_address,
            &snapshot.network_params,
        )?;
        self.publish_device_info(&info, today).await?;

        let per_user_times = group_punches(&snapshot.punches, today);
        if per_user_times.is_empty() {
            info!(date = %today, "no punches recorded, nothing to reconcile");
            return Ok(());
        }

        let directory: BTreeMap<String, DeviceUser> = snapshot
            .users
            .into_iter()
            .map(|user| (user.user_id.clone(), user))
            .collect();

        let incoming = build_document(&info.description.serial_number, today, &directory, per_user_times);
        if incoming.users.is_empty() {
            info!(date = %today, "no punches matched known users");
            return Ok(());
        }

        let existing = self.store.load(today)?;
        let merged = merge(existing, incoming);
        self.store.save(&merged)?;

        let payload = serde_json::to_value(&merged)?;
        match self.transport.send(PendingKind::Attendance, &payload).await {
            Ok(()) => {
                info!(date = %today, users = merged.users.len(), "attendance document delivered")
            }
            Err(e) => {
                warn!(date = %today, "attendance delivery failed, queued for retry: {e}");
                self.queue.enqueue(PendingKind::Attendance, payload).await?;
            }
        }

        Ok(())
    }

    /// Snapshot and deliver the device identity once per process. A failed
    /// delivery is handed to the queue, which owns it from then on.
    async fn publish_device_info(&mut self, info: &DeviceInfo, date: NaiveDate) -> Result<()> {
        if self.device_info_sent {
            return Ok(());
        }

        self.store.save_device_snapshot(info, date)?;

        let payload = serde_json::to_value(info)?;
        match self.transport.send(PendingKind::Device, &payload).await {
            Ok(()) => info!(device = %info.device_id, "device identity delivered"),
            Err(e) => {
                warn!(device = %info.device_id, "device identity delivery failed, queued for retry: {e}");
                self.queue.enqueue(PendingKind::Device, payload).await?;
            }
        }

        self.device_info_sent = true;
        Ok(())
    }
}

#[async_trait]
impl<C, S> CycleRunner for AttendancePipeline<C, S>
where
    C: DeviceConnector,
    S: DocumentStore,
{
    async fn run_cycle(&mut self, date: NaiveDate) -> Result<()> {
        AttendancePipeline::run_cycle(self, date).await
    }
}

//! In-memory fakes and fixtures shared by unit tests

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::cloud::{CloudApi, CloudError};
use crate::gateway::{RateLimitedGateway, RateLimiter};
use crate::resource::{Cluster, Host, Image, User, VirtualMachine};
use crate::writer::{RecordSink, WriterError};

#[derive(Default)]
pub struct CallCounts {
    pub vm_page: AtomicUsize,
    pub vm: AtomicUsize,
    pub active_vms: AtomicUsize,
    pub users: AtomicUsize,
    pub images: AtomicUsize,
    pub hosts: AtomicUsize,
    pub clusters: AtomicUsize,
}

/// Cloud API backed by vectors of parsed resources
#[derive(Default)]
pub struct FakeCloud {
    pub calls: CallCounts,
    pub fail_users: AtomicBool,
    pub fail_vm_pages: AtomicBool,
    pub fail_hosts: AtomicBool,
    vms: Mutex<Vec<VirtualMachine>>,
    failing_vms: Mutex<HashSet<i64>>,
    users: Mutex<Vec<User>>,
    images: Mutex<Vec<Image>>,
    hosts: Mutex<Vec<Host>>,
    clusters: Mutex<Vec<Cluster>>,
    active: Mutex<HashMap<i64, Vec<VirtualMachine>>>,
}

fn fault(method: &str, message: &str) -> CloudError {
    CloudError::Fault {
        method: method.to_string(),
        message: message.to_string(),
    }
}

fn page<T: Clone>(items: &[T], offset: u32, page_size: u32) -> Result<Vec<T>, CloudError> {
    if offset == 0 {
        return Err(CloudError::InvalidPageOffset(0));
    }
    let start = (offset as usize - 1) * page_size as usize;
    Ok(items
        .iter()
        .skip(start)
        .take(page_size as usize)
        .cloned()
        .collect())
}

fn parse_all<T>(
    xml: impl IntoIterator<Item = String>,
    parse: fn(&str) -> Result<T, crate::resource::ResourceError>,
) -> Vec<T> {
    xml.into_iter()
        .map(|doc| parse(&doc).unwrap())
        .collect()
}

impl FakeCloud {
    pub fn with_vms(vms: impl IntoIterator<Item = String>) -> Self {
        let cloud = Self::default();
        cloud.add_vms(vms);
        cloud
    }

    pub fn add_vms(&self, vms: impl IntoIterator<Item = String>) {
        self.vms
            .lock()
            .extend(parse_all(vms, VirtualMachine::from_xml));
    }

    /// Listed in pages but failing on retrieval
    pub fn fail_vm(&self, id: i64) {
        self.failing_vms.lock().insert(id);
    }

    pub fn add_users(&self, users: impl IntoIterator<Item = String>) {
        self.users.lock().extend(parse_all(users, User::from_xml));
    }

    pub fn add_images(&self, images: impl IntoIterator<Item = String>) {
        self.images.lock().extend(parse_all(images, Image::from_xml));
    }

    pub fn add_hosts(&self, hosts: impl IntoIterator<Item = String>) {
        self.hosts.lock().extend(parse_all(hosts, Host::from_xml));
    }

    pub fn add_clusters(&self, clusters: impl IntoIterator<Item = String>) {
        self.clusters
            .lock()
            .extend(parse_all(clusters, Cluster::from_xml));
    }

    pub fn set_active_vms(&self, user_id: i64, vms: impl IntoIterator<Item = String>) {
        self.active
            .lock()
            .insert(user_id, parse_all(vms, VirtualMachine::from_xml));
    }
}

#[async_trait]
impl CloudApi for FakeCloud {
    async fn vm_page(
        &self,
        offset: u32,
        page_size: u32,
    ) -> Result<Vec<VirtualMachine>, CloudError> {
        self.calls.vm_page.fetch_add(1, Ordering::SeqCst);
        if self.fail_vm_pages.load(Ordering::SeqCst) {
            return Err(fault("one.vmpool.info", "pool unavailable"));
        }
        page(&self.vms.lock(), offset, page_size)
    }

    async fn vm(&self, id: i64) -> Result<VirtualMachine, CloudError> {
        self.calls.vm.fetch_add(1, Ordering::SeqCst);
        if self.failing_vms.lock().contains(&id) {
            return Err(fault("one.vm.info", "backend error"));
        }
        self.vms
            .lock()
            .iter()
            .find(|vm| crate::resource::Resource::id(*vm).ok() == Some(id))
            .cloned()
            .ok_or_else(|| fault("one.vm.info", "not found"))
    }

    async fn active_vms_of_user(&self, user_id: i64) -> Result<Vec<VirtualMachine>, CloudError> {
        self.calls.active_vms.fetch_add(1, Ordering::SeqCst);
        Ok(self.active.lock().get(&user_id).cloned().unwrap_or_default())
    }

    async fn users(&self) -> Result<Vec<User>, CloudError> {
        self.calls.users.fetch_add(1, Ordering::SeqCst);
        if self.fail_users.load(Ordering::SeqCst) {
            return Err(fault("one.userpool.info", "pool unavailable"));
        }
        Ok(self.users.lock().clone())
    }

    async fn images(&self) -> Result<Vec<Image>, CloudError> {
        self.calls.images.fetch_add(1, Ordering::SeqCst);
        Ok(self.images.lock().clone())
    }

    async fn hosts(&self) -> Result<Vec<Host>, CloudError> {
        self.calls.hosts.fetch_add(1, Ordering::SeqCst);
        if self.fail_hosts.load(Ordering::SeqCst) {
            return Err(fault("one.hostpool.info", "pool unavailable"));
        }
        Ok(self.hosts.lock().clone())
    }

    async fn clusters(&self) -> Result<Vec<Cluster>, CloudError> {
        self.calls.clusters.fetch_add(1, Ordering::SeqCst);
        Ok(self.clusters.lock().clone())
    }
}

/// Gateway with a generous limiter and millisecond retries
pub fn fast_gateway() -> RateLimitedGateway {
    fast_gateway_with(CancellationToken::new())
}

pub fn fast_gateway_with(cancel: CancellationToken) -> RateLimitedGateway {
    let limiter = Arc::new(RateLimiter::new("test", 10_000.0, 10_000));
    RateLimitedGateway::new(limiter, cancel, Duration::from_secs(5))
        .with_retry(3, Duration::from_millis(1))
}

/// Minimal compute instance; `etime` 0 means still running
pub fn vm_xml(id: i64, stime: i64, etime: i64) -> String {
    format!(
        "<VM><ID>{id}</ID><UID>1</UID><GID>1</GID><GNAME>users</GNAME>\
         <DEPLOY_ID>one-{id}</DEPLOY_ID><STATE>3</STATE>\
         <STIME>{stime}</STIME><ETIME>{etime}</ETIME>\
         <TEMPLATE><VCPU>1</VCPU><MEMORY>1024</MEMORY></TEMPLATE></VM>"
    )
}

pub fn user_xml(id: i64, gid: i64, identity: Option<&str>) -> String {
    let identity = identity
        .map(|value| format!("<IDENTITY>{value}</IDENTITY>"))
        .unwrap_or_default();
    format!(
        "<USER><ID>{id}</ID><GID>{gid}</GID><GNAME>users</GNAME>\
         <TEMPLATE>{identity}</TEMPLATE></USER>"
    )
}

/// Step of a recorded sink session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Write,
    Identifier,
    Finish,
}

/// Sink that keeps every record it receives
pub struct RecordingSink<R> {
    pub records: Mutex<Vec<R>>,
    pub events: Mutex<Vec<SinkEvent>>,
    pub fail_writes: AtomicBool,
    pub fail_identifier: AtomicBool,
    pub fail_finish: AtomicBool,
}

impl<R> Default for RecordingSink<R> {
    fn default() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
            fail_identifier: AtomicBool::new(false),
            fail_finish: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl<R: Send + 'static> RecordSink<R> for RecordingSink<R> {
    async fn write(&self, record: R) -> Result<(), WriterError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(WriterError::StreamClosed);
        }
        self.events.lock().push(SinkEvent::Write);
        self.records.lock().push(record);
        Ok(())
    }

    async fn send_identifier(&self) -> Result<(), WriterError> {
        if self.fail_identifier.load(Ordering::SeqCst) {
            return Err(WriterError::StreamClosed);
        }
        self.events.lock().push(SinkEvent::Identifier);
        Ok(())
    }

    async fn finish(&self) -> Result<(), WriterError> {
        if self.fail_finish.load(Ordering::SeqCst) {
            return Err(WriterError::Status(tonic::Status::unavailable("collector down")));
        }
        self.events.lock().push(SinkEvent::Finish);
        Ok(())
    }
}

impl<R: Send + 'static> RecordingSink<R> {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

/// Messages of the ERROR events seen while installed as a layer
#[derive(Clone, Default)]
pub struct ErrorCapture {
    messages: Arc<Mutex<Vec<String>>>,
}

impl ErrorCapture {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for ErrorCapture {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        if *event.metadata().level() != tracing::Level::ERROR {
            return;
        }
        let mut message = MessageField::default();
        event.record(&mut message);
        self.messages.lock().push(message.0);
    }
}

#[derive(Default)]
struct MessageField(String);

impl tracing::field::Visit for MessageField {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

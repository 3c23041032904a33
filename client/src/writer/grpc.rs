//! gRPC client-streaming session to the accounting collector
//!
//! The session owns one outgoing stream. Messages go through a bounded
//! channel into a spawned task that drives the tonic call; the task resolves
//! with the collector's acknowledgment once the channel is closed.
//!
//! Writes come from many concurrent preparation tasks. They are serialized
//! by a mutex around the sender, so at most one message is handed to the
//! stream at a time and `finish` waits for every write already in progress.

use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::{Channel, Endpoint};

use cloudtally_proto::{
    AccountingServiceClient, IpData, IpRecord, StorageData, StorageRecord, VmData, VmRecord,
    ip_data, storage_data, vm_data,
};

use super::{RecordSink, WriterError};
use crate::core::constants::{COLLECTOR_STREAM_BUFFER, COLLECTOR_TIMEOUT_SECS};
use crate::gateway::RateLimitedGateway;

type Ack = Result<tonic::Response<()>, tonic::Status>;

/// Binds a record type to its stream message and RPC
pub trait AccountingStream: Send + Sync + 'static {
    type Record: Send + 'static;
    type Message: Clone + Send + Sync + 'static;

    /// Kind name used in logs
    const KIND: &'static str;

    fn identifier(identifier: String) -> Self::Message;

    fn record(record: Self::Record) -> Self::Message;

    fn open(
        client: AccountingServiceClient<Channel>,
        messages: ReceiverStream<Self::Message>,
    ) -> BoxFuture<'static, Ack>;
}

pub struct VmStream;

impl AccountingStream for VmStream {
    type Record = VmRecord;
    type Message = VmData;

    const KIND: &'static str = "vm";

    fn identifier(identifier: String) -> VmData {
        VmData {
            data: Some(vm_data::Data::Identifier(identifier)),
        }
    }

    fn record(record: VmRecord) -> VmData {
        VmData {
            data: Some(vm_data::Data::Vm(record)),
        }
    }

    fn open(
        mut client: AccountingServiceClient<Channel>,
        messages: ReceiverStream<VmData>,
    ) -> BoxFuture<'static, Ack> {
        Box::pin(async move { client.process_vms(messages).await })
    }
}

pub struct IpStream;

impl AccountingStream for IpStream {
    type Record = IpRecord;
    type Message = IpData;

    const KIND: &'static str = "network";

    fn identifier(identifier: String) -> IpData {
        IpData {
            data: Some(ip_data::Data::Identifier(identifier)),
        }
    }

    fn record(record: IpRecord) -> IpData {
        IpData {
            data: Some(ip_data::Data::Ip(record)),
        }
    }

    fn open(
        mut client: AccountingServiceClient<Channel>,
        messages: ReceiverStream<IpData>,
    ) -> BoxFuture<'static, Ack> {
        Box::pin(async move { client.process_ips(messages).await })
    }
}

pub struct StorageStream;

impl AccountingStream for StorageStream {
    type Record = StorageRecord;
    type Message = StorageData;

    const KIND: &'static str = "storage";

    fn identifier(identifier: String) -> StorageData {
        StorageData {
            data: Some(storage_data::Data::Identifier(identifier)),
        }
    }

    fn record(record: StorageRecord) -> StorageData {
        StorageData {
            data: Some(storage_data::Data::Storage(record)),
        }
    }

    fn open(
        mut client: AccountingServiceClient<Channel>,
        messages: ReceiverStream<StorageData>,
    ) -> BoxFuture<'static, Ack> {
        Box::pin(async move { client.process_storages(messages).await })
    }
}

pub struct GrpcWriter<S: AccountingStream> {
    identifier: String,
    gateway: RateLimitedGateway,
    sender: Mutex<Option<mpsc::Sender<S::Message>>>,
    session: Mutex<Option<JoinHandle<Ack>>>,
    ack_timeout: Duration,
    _stream: PhantomData<S>,
}

impl<S: AccountingStream> GrpcWriter<S> {
    /// Connect to the collector and open the stream
    pub async fn connect(
        endpoint: &str,
        identifier: String,
        gateway: RateLimitedGateway,
    ) -> Result<Self, WriterError> {
        let connect_error = |message: String| WriterError::Connect {
            endpoint: endpoint.to_string(),
            message,
        };
        let channel = Endpoint::from_shared(endpoint.to_string())
            .map_err(|e| connect_error(e.to_string()))?
            .connect_timeout(Duration::from_secs(COLLECTOR_TIMEOUT_SECS))
            .connect()
            .await
            .map_err(|e| connect_error(e.to_string()))?;

        tracing::debug!(endpoint, kind = S::KIND, "Connected to collector");
        Ok(Self::with_channel(channel, identifier, gateway))
    }

    /// Open the stream over an existing channel
    pub fn with_channel(channel: Channel, identifier: String, gateway: RateLimitedGateway) -> Self {
        let (sender, receiver) = mpsc::channel(COLLECTOR_STREAM_BUFFER);
        let client = AccountingServiceClient::new(channel);
        let session = tokio::spawn(S::open(client, ReceiverStream::new(receiver)));

        Self {
            identifier,
            gateway,
            sender: Mutex::new(Some(sender)),
            session: Mutex::new(Some(session)),
            ack_timeout: Duration::from_secs(COLLECTOR_TIMEOUT_SECS),
            _stream: PhantomData,
        }
    }

    async fn send(&self, message: S::Message) -> Result<(), WriterError> {
        let guard = self.sender.lock().await;
        let sender = guard.as_ref().ok_or(WriterError::Finished)?;
        if sender.is_closed() {
            return Err(WriterError::StreamClosed);
        }

        self.gateway
            .call(S::KIND, || {
                let sender = sender.clone();
                let message = message.clone();
                async move {
                    sender
                        .send(message)
                        .await
                        .map_err(|_| WriterError::StreamClosed)
                }
            })
            .await
            .map_err(WriterError::from)
    }
}

#[async_trait]
impl<S: AccountingStream> RecordSink<S::Record> for GrpcWriter<S> {
    async fn write(&self, record: S::Record) -> Result<(), WriterError> {
        self.send(S::record(record)).await
    }

    async fn send_identifier(&self) -> Result<(), WriterError> {
        self.send(S::identifier(self.identifier.clone())).await
    }

    async fn finish(&self) -> Result<(), WriterError> {
        // Dropping the sender ends the outgoing stream
        drop(self.sender.lock().await.take());
        let session = self
            .session
            .lock()
            .await
            .take()
            .ok_or(WriterError::Finished)?;

        match tokio::time::timeout(self.ack_timeout, session).await {
            Ok(Ok(Ok(_))) => {
                tracing::debug!(kind = S::KIND, "Collector acknowledged session");
                Ok(())
            }
            Ok(Ok(Err(status))) => Err(WriterError::Status(status)),
            Ok(Err(join)) => Err(WriterError::Task(join.to_string())),
            Err(_) => Err(WriterError::Timeout(self.ack_timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fast_gateway;

    fn unreachable_writer() -> GrpcWriter<VmStream> {
        // Nothing listens on port 1; the session fails once it tries to connect
        let channel = Endpoint::from_static("http://127.0.0.1:1").connect_lazy();
        GrpcWriter::with_channel(channel, "site-a".to_string(), fast_gateway())
    }

    #[test]
    fn test_stream_messages() {
        assert_eq!(
            VmStream::identifier("site-a".to_string()).data,
            Some(vm_data::Data::Identifier("site-a".to_string()))
        );
        let record = IpRecord {
            ip_count: 2,
            ..Default::default()
        };
        assert_eq!(
            IpStream::record(record.clone()).data,
            Some(ip_data::Data::Ip(record))
        );
    }

    #[tokio::test]
    async fn test_finish_reports_failed_session() {
        let writer = unreachable_writer();
        assert!(matches!(writer.finish().await, Err(WriterError::Status(_))));
    }

    #[tokio::test]
    async fn test_session_is_single_use() {
        let writer = unreachable_writer();
        let _ = writer.finish().await;

        assert!(matches!(writer.finish().await, Err(WriterError::Finished)));
        assert!(matches!(
            writer.write(VmRecord::default()).await,
            Err(WriterError::Finished)
        ));
        assert!(matches!(
            writer.send_identifier().await,
            Err(WriterError::Finished)
        ));
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_endpoint() {
        let result = GrpcWriter::<StorageStream>::connect(
            "not a uri",
            "site-a".to_string(),
            fast_gateway(),
        )
        .await;
        assert!(matches!(result, Err(WriterError::Connect { .. })));
    }
}

//! OpenNebula XML-RPC client

use std::time::Duration;

use async_trait::async_trait;

use super::xmlrpc::{self, Param};
use super::{CloudApi, CloudError};
use crate::resource::{
    Cluster, Element, Host, Image, User, VirtualMachine, VmState,
};

/// Pool filter selecting resources of all owners
const FILTER_ALL: i64 = -2;

/// Compute instance state filter matching any state including done
const STATE_ANY_INCLUDING_DONE: i64 = -1;

pub struct OpenNebulaClient {
    http: reqwest::Client,
    endpoint: reqwest::Url,
    session: String,
}

impl std::fmt::Debug for OpenNebulaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenNebulaClient")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

impl OpenNebulaClient {
    /// Create a client; fails on a malformed endpoint or a secret that is not `user:password`
    pub fn new(endpoint: &str, secret: &str, timeout: Duration) -> Result<Self, CloudError> {
        let endpoint = reqwest::Url::parse(endpoint)
            .map_err(|e| CloudError::Config(format!("invalid endpoint '{endpoint}': {e}")))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(CloudError::Config(format!(
                "endpoint '{endpoint}' must use http or https"
            )));
        }

        match secret.split_once(':') {
            Some((user, _)) if !user.is_empty() => {}
            _ => {
                return Err(CloudError::Config(
                    "secret must have the form user:password".to_string(),
                ));
            }
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CloudError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint,
            session: secret.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    /// Perform one call and parse the returned document
    async fn call(&self, method: &str, params: Vec<Param>) -> Result<Element, CloudError> {
        let mut all = Vec::with_capacity(params.len() + 1);
        all.push(Param::Str(self.session.clone()));
        all.extend(params);

        tracing::trace!(method, "Cloud API call");
        let response = self
            .http
            .post(self.endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, "text/xml")
            .body(xmlrpc::method_call(method, &all))
            .send()
            .await?
            .error_for_status()?;
        let text = response.text().await?;

        let body = xmlrpc::parse_response(method, &text)?;
        Ok(Element::parse(&body)?)
    }

    async fn pool<T>(
        &self,
        method: &str,
        params: Vec<Param>,
        item: &str,
        wrap: fn(Element) -> T,
    ) -> Result<Vec<T>, CloudError> {
        let pool = self.call(method, params).await?;
        Ok(pool.children_named(item).cloned().map(wrap).collect())
    }
}

/// Start index and negative page size for pool pagination
fn page_range(offset: u32, page_size: u32) -> Result<(Param, Param), CloudError> {
    if offset == 0 {
        return Err(CloudError::InvalidPageOffset(offset));
    }
    let start = i64::from(offset - 1) * i64::from(page_size);
    Ok((Param::Int(start), Param::Int(-i64::from(page_size))))
}

#[async_trait]
impl CloudApi for OpenNebulaClient {
    async fn vm_page(
        &self,
        offset: u32,
        page_size: u32,
    ) -> Result<Vec<VirtualMachine>, CloudError> {
        let (start, end) = page_range(offset, page_size)?;
        self.pool(
            "one.vmpool.info",
            vec![
                Param::Int(FILTER_ALL),
                start,
                end,
                Param::Int(STATE_ANY_INCLUDING_DONE),
            ],
            "VM",
            VirtualMachine::new,
        )
        .await
    }

    async fn vm(&self, id: i64) -> Result<VirtualMachine, CloudError> {
        let vm = self.call("one.vm.info", vec![Param::Int(id)]).await?;
        Ok(VirtualMachine::new(vm))
    }

    async fn active_vms_of_user(&self, user_id: i64) -> Result<Vec<VirtualMachine>, CloudError> {
        self.pool(
            "one.vmpool.info",
            vec![
                Param::Int(user_id),
                Param::Int(-1),
                Param::Int(-1),
                Param::Int(VmState::ACTIVE_CODE),
            ],
            "VM",
            VirtualMachine::new,
        )
        .await
    }

    async fn users(&self) -> Result<Vec<User>, CloudError> {
        self.pool("one.userpool.info", vec![], "USER", User::new)
            .await
    }

    async fn images(&self) -> Result<Vec<Image>, CloudError> {
        self.pool(
            "one.imagepool.info",
            vec![Param::Int(FILTER_ALL), Param::Int(-1), Param::Int(-1)],
            "IMAGE",
            Image::new,
        )
        .await
    }

    async fn hosts(&self) -> Result<Vec<Host>, CloudError> {
        self.pool("one.hostpool.info", vec![], "HOST", Host::new)
            .await
    }

    async fn clusters(&self) -> Result<Vec<Cluster>, CloudError> {
        self.pool("one.clusterpool.info", vec![], "CLUSTER", Cluster::new)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Resource;
    use httpmock::prelude::*;
    use quick_xml::escape::escape;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn response(body: &str) -> String {
        format!(
            "<?xml version=\"1.0\"?><methodResponse><params><param><value><array><data>\
             <value><boolean>1</boolean></value>\
             <value><string>{}</string></value>\
             <value><i4>0</i4></value>\
             </data></array></value></param></params></methodResponse>",
            escape(body)
        )
    }

    #[test]
    fn test_new_rejects_bad_configuration() {
        assert!(matches!(
            OpenNebulaClient::new("not a url", "oneadmin:secret", TIMEOUT),
            Err(CloudError::Config(_))
        ));
        assert!(matches!(
            OpenNebulaClient::new("ftp://one:2633/RPC2", "oneadmin:secret", TIMEOUT),
            Err(CloudError::Config(_))
        ));
        assert!(matches!(
            OpenNebulaClient::new("http://one:2633/RPC2", "oneadmin", TIMEOUT),
            Err(CloudError::Config(_))
        ));
        assert!(matches!(
            OpenNebulaClient::new("http://one:2633/RPC2", ":secret", TIMEOUT),
            Err(CloudError::Config(_))
        ));
        assert!(OpenNebulaClient::new("http://one:2633/RPC2", "oneadmin:secret", TIMEOUT).is_ok());
    }

    #[test]
    fn test_page_range() {
        assert!(matches!(
            page_range(0, 100),
            Err(CloudError::InvalidPageOffset(0))
        ));
        assert_eq!(
            page_range(1, 100).unwrap(),
            (Param::Int(0), Param::Int(-100))
        );
        assert_eq!(
            page_range(3, 100).unwrap(),
            (Param::Int(200), Param::Int(-100))
        );
    }

    #[tokio::test]
    async fn test_vm_page_over_http() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/RPC2")
                    .body_includes("<methodName>one.vmpool.info</methodName>")
                    .body_includes("<string>oneadmin:secret</string>")
                    .body_includes("<value><int>100</int></value>");
                then.status(200).body(response(
                    "<VM_POOL><VM><ID>1</ID></VM><VM><ID>2</ID></VM></VM_POOL>",
                ));
            })
            .await;

        let client =
            OpenNebulaClient::new(&server.url("/RPC2"), "oneadmin:secret", TIMEOUT).unwrap();
        let vms = client.vm_page(2, 100).await.unwrap();

        mock.assert_async().await;
        let ids: Vec<i64> = vms.iter().map(|vm| vm.id().unwrap()).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_users_and_fault() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/RPC2")
                    .body_includes("one.userpool.info");
                then.status(200).body(response(
                    "<USER_POOL><USER><ID>0</ID><TEMPLATE><IDENTITY>admin</IDENTITY></TEMPLATE></USER></USER_POOL>",
                ));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/RPC2").body_includes("one.vm.info");
                then.status(200).body(
                    "<methodResponse><params><param><value><array><data>\
                     <value><boolean>0</boolean></value>\
                     <value><string>[one.vm.info] Error getting virtual machine [5].</string></value>\
                     <value><i4>1024</i4></value>\
                     </data></array></value></param></params></methodResponse>",
                );
            })
            .await;

        let client =
            OpenNebulaClient::new(&server.url("/RPC2"), "oneadmin:secret", TIMEOUT).unwrap();

        let users = client.users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].attribute("TEMPLATE/IDENTITY").unwrap(), "admin");

        let err = client.vm(5).await.unwrap_err();
        assert!(matches!(err, CloudError::Fault { .. }));
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/RPC2");
                then.status(503);
            })
            .await;

        let client =
            OpenNebulaClient::new(&server.url("/RPC2"), "oneadmin:secret", TIMEOUT).unwrap();
        assert!(matches!(
            client.hosts().await,
            Err(CloudError::Transport(_))
        ));
    }
}

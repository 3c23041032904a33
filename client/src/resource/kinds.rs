//! Concrete resource kinds exposed by the cloud API

use std::net::IpAddr;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use super::{Element, Resource, ResourceError};
use crate::utils::time::secs_to_datetime;

macro_rules! resource_kind {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name(Element);

        impl $name {
            pub fn new(element: Element) -> Self {
                Self(element)
            }

            pub fn from_xml(xml: &str) -> Result<Self, ResourceError> {
                Element::parse(xml).map(Self)
            }
        }

        impl Resource for $name {
            fn element(&self) -> &Element {
                &self.0
            }
        }
    };
}

resource_kind!(
    /// Compute instance (`<VM>`)
    VirtualMachine
);
resource_kind!(
    /// Cloud user (`<USER>`)
    User
);
resource_kind!(
    /// Registered image, accounted as storage (`<IMAGE>`)
    Image
);
resource_kind!(
    /// Hypervisor host (`<HOST>`)
    Host
);
resource_kind!(
    /// Group of hosts (`<CLUSTER>`)
    Cluster
);

/// Lifecycle state of a compute instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmState {
    Init,
    Pending,
    Hold,
    Active,
    Stopped,
    Suspended,
    Done,
    Failed,
    Poweroff,
    Undeployed,
    Cloning,
    CloningFailure,
}

impl VmState {
    /// State code used by the API for "active" when filtering pools
    pub const ACTIVE_CODE: i64 = 3;

    pub fn from_code(code: i64) -> Option<Self> {
        let state = match code {
            0 => Self::Init,
            1 => Self::Pending,
            2 => Self::Hold,
            3 => Self::Active,
            4 => Self::Stopped,
            5 => Self::Suspended,
            6 => Self::Done,
            7 => Self::Failed,
            8 => Self::Poweroff,
            9 => Self::Undeployed,
            10 => Self::Cloning,
            11 => Self::CloningFailure,
            _ => return None,
        };
        Some(state)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::Pending => "PENDING",
            Self::Hold => "HOLD",
            Self::Active => "ACTIVE",
            Self::Stopped => "STOPPED",
            Self::Suspended => "SUSPENDED",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
            Self::Poweroff => "POWEROFF",
            Self::Undeployed => "UNDEPLOYED",
            Self::Cloning => "CLONING",
            Self::CloningFailure => "CLONING_FAILURE",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Disk {
    /// Size in MB
    pub size: Option<u64>,
    pub image_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Nic {
    pub ip: Option<IpAddr>,
    pub ip6_global: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryRecord {
    pub host_id: Option<i64>,
    /// Resource start, seconds since epoch
    pub rstime: Option<i64>,
    /// Resource end, seconds since epoch; 0 while still running
    pub retime: Option<i64>,
}

fn child_parsed<T: FromStr>(element: &Element, name: &str) -> Option<T> {
    element
        .find(name)
        .map(|e| e.text().trim())
        .filter(|t| !t.is_empty())
        .and_then(|t| t.parse().ok())
}

fn non_empty<'a, R: Resource>(resource: &'a R, path: &str) -> Result<&'a str, ResourceError> {
    let value = resource.attribute(path)?;
    if value.is_empty() {
        return Err(ResourceError::MissingAttribute(path.to_string()));
    }
    Ok(value)
}

fn epoch_seconds<R: Resource>(resource: &R, path: &str) -> Result<DateTime<Utc>, ResourceError> {
    let secs: i64 = resource.parsed(path)?;
    secs_to_datetime(secs).ok_or_else(|| ResourceError::InvalidValue {
        path: path.to_string(),
        value: secs.to_string(),
    })
}

impl VirtualMachine {
    /// Owner id (`UID`)
    pub fn user(&self) -> Result<i64, ResourceError> {
        self.parsed("UID")
    }

    /// Owning group id (`GID`)
    pub fn group(&self) -> Result<i64, ResourceError> {
        self.parsed("GID")
    }

    pub fn group_name(&self) -> Result<&str, ResourceError> {
        non_empty(self, "GNAME")
    }

    /// Hypervisor-side name (`DEPLOY_ID`)
    pub fn deploy_id(&self) -> Result<&str, ResourceError> {
        self.attribute("DEPLOY_ID")
    }

    pub fn state(&self) -> Result<VmState, ResourceError> {
        let code: i64 = self.parsed("STATE")?;
        VmState::from_code(code).ok_or_else(|| ResourceError::InvalidValue {
            path: "STATE".to_string(),
            value: code.to_string(),
        })
    }

    pub fn start_time(&self) -> Result<DateTime<Utc>, ResourceError> {
        epoch_seconds(self, "STIME")
    }

    /// End time, `None` while the instance is still running (`ETIME` of 0)
    pub fn end_time(&self) -> Result<Option<DateTime<Utc>>, ResourceError> {
        let secs: i64 = self.parsed("ETIME")?;
        if secs == 0 {
            return Ok(None);
        }
        epoch_seconds(self, "ETIME").map(Some)
    }

    pub fn vcpu(&self) -> Result<u32, ResourceError> {
        self.parsed("TEMPLATE/VCPU")
    }

    /// Memory in MB
    pub fn memory(&self) -> Result<u64, ResourceError> {
        self.parsed("TEMPLATE/MEMORY")
    }

    pub fn disks(&self) -> Vec<Disk> {
        self.0
            .find_all("TEMPLATE/DISK")
            .into_iter()
            .map(|disk| Disk {
                size: child_parsed(disk, "SIZE"),
                image_id: child_parsed(disk, "IMAGE_ID"),
            })
            .collect()
    }

    pub fn nics(&self) -> Vec<Nic> {
        self.0
            .find_all("TEMPLATE/NIC")
            .into_iter()
            .map(|nic| Nic {
                ip: child_parsed(nic, "IP"),
                ip6_global: nic
                    .find("IP6_GLOBAL")
                    .map(|e| e.text().to_string())
                    .filter(|t| !t.is_empty()),
            })
            .collect()
    }

    pub fn history(&self) -> Vec<HistoryRecord> {
        self.0
            .find_all("HISTORY_RECORDS/HISTORY")
            .into_iter()
            .map(|record| HistoryRecord {
                host_id: child_parsed(record, "HID"),
                rstime: child_parsed(record, "RSTIME"),
                retime: child_parsed(record, "RETIME"),
            })
            .collect()
    }
}

impl User {
    /// Main group id (`GID`)
    pub fn group(&self) -> Result<i64, ResourceError> {
        self.parsed("GID")
    }

    pub fn group_name(&self) -> Result<&str, ResourceError> {
        non_empty(self, "GNAME")
    }
}

impl Image {
    pub fn user(&self) -> Result<i64, ResourceError> {
        self.parsed("UID")
    }

    pub fn group(&self) -> Result<i64, ResourceError> {
        self.parsed("GID")
    }

    pub fn group_name(&self) -> Result<&str, ResourceError> {
        non_empty(self, "GNAME")
    }

    pub fn registration_time(&self) -> Result<DateTime<Utc>, ResourceError> {
        epoch_seconds(self, "REGTIME")
    }

    /// Size in MB
    pub fn size(&self) -> Result<u64, ResourceError> {
        self.parsed("SIZE")
    }

    pub fn datastore(&self) -> Result<&str, ResourceError> {
        non_empty(self, "DATASTORE")
    }
}

impl Host {
    pub fn cluster_id(&self) -> Result<i64, ResourceError> {
        self.parsed("CLUSTER_ID")
    }
}

/// A user together with its active compute instances
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetUser {
    pub user: User,
    pub active_vms: Vec<VirtualMachine>,
}

impl Resource for NetUser {
    fn element(&self) -> &Element {
        self.user.element()
    }
}

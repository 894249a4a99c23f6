use std::fmt;

/// Leading element of every steady-state message list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum RequestType {
    Invalid = 0,
    Sync = 1,
    RpcCall = 2,
    InitRequest = 3,
    InitData = 4,
    Heartbeat = 5,
    HeartbeatReply = 6,
}

impl RequestType {
    pub fn id(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            RequestType::Invalid => "Invalid",
            RequestType::Sync => "Sync",
            RequestType::RpcCall => "RpcCall",
            RequestType::InitRequest => "InitRequest",
            RequestType::InitData => "InitData",
            RequestType::Heartbeat => "Heartbeat",
            RequestType::HeartbeatReply => "HeartbeatReply",
        }
    }
}

impl TryFrom<i64> for RequestType {
    type Error = i64;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => RequestType::Invalid,
            1 => RequestType::Sync,
            2 => RequestType::RpcCall,
            3 => RequestType::InitRequest,
            4 => RequestType::InitData,
            5 => RequestType::Heartbeat,
            6 => RequestType::HeartbeatReply,
            other => return Err(other),
        })
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

use std::path::PathBuf;
use zeroize::Zeroizing;

#[derive(Clone, Debug)]
pub struct SshConnectConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub auth_method: AuthMethod,
    pub host_key_policy: HostKeyPolicy,
    pub keepalive_interval_secs: u64,
    pub connect_timeout_ms: u64,
}

#[derive(Clone, Debug)]
pub enum AuthMethod {
    Key {
        private_key_path: PathBuf,
        passphrase: Option<Zeroizing<String>>,
    },
    Agent,
}

#[derive(Clone, Debug)]
pub enum HostKeyPolicy {
    InsecureAcceptAny,
    Fingerprints(Vec<String>),
}

impl HostKeyPolicy {
    pub fn from_config(name: &str, fingerprints: &[String]) -> anyhow::Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "accept-any" | "insecure-accept-any" => Ok(Self::InsecureAcceptAny),
            "fingerprints" | "pinned" => Ok(Self::Fingerprints(fingerprints.to_vec())),
            other => Err(anyhow::anyhow!("unknown host key policy: {other}")),
        }
    }

    pub fn accepts(&self, fingerprint: &str) -> bool {
        match self {
            HostKeyPolicy::InsecureAcceptAny => true,
            HostKeyPolicy::Fingerprints(list) => list.iter().any(|f| f.trim() == fingerprint),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pinned_policy_matches_listed_fingerprint_only() {
        let policy =
            HostKeyPolicy::from_config("fingerprints", &["SHA256:abc".to_string()]).unwrap();
        assert!(policy.accepts("SHA256:abc"));
        assert!(!policy.accepts("SHA256:def"));
    }

    #[test]
    fn unknown_policy_rejected() {
        assert!(HostKeyPolicy::from_config("trust-me", &[]).is_err());
        assert!(HostKeyPolicy::from_config("accept-any", &[])
            .unwrap()
            .accepts("anything"));
    }
}

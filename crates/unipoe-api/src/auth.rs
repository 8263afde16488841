use std::fmt;

use secrecy::SecretString;

/// Username/password pair for cookie-based session login.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<SecretString>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// The generation of the UniFi controller behind the base URL.
///
/// Determines the login endpoint and whether network API paths need the
/// `proxy/network/` prefix. Detected once per process and cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerPlatform {
    /// UniFi OS console (UDM, UCG, Cloud Key Gen2+) -- port 443, `proxy/network/` prefix.
    UnifiOs,
    /// Standalone Network Application (Java) -- port 8443, no prefix.
    ClassicController,
}

impl ControllerPlatform {
    /// Path prefix prepended to every network API path.
    pub fn api_prefix(self) -> &'static str {
        match self {
            Self::UnifiOs => "proxy/network/",
            Self::ClassicController => "",
        }
    }

    /// The login endpoint, relative to the controller root.
    pub fn login_path(self) -> &'static str {
        match self {
            Self::UnifiOs => "api/auth/login",
            Self::ClassicController => "api/login",
        }
    }

    /// The logout endpoint, relative to the controller root.
    pub fn logout_path(self) -> &'static str {
        match self {
            Self::UnifiOs => "api/auth/logout",
            Self::ClassicController => "api/logout",
        }
    }
}

impl fmt::Display for ControllerPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnifiOs => f.write_str("UniFi OS"),
            Self::ClassicController => f.write_str("classic controller"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unifi_os_paths() {
        let p = ControllerPlatform::UnifiOs;
        assert_eq!(p.api_prefix(), "proxy/network/");
        assert_eq!(p.login_path(), "api/auth/login");
        assert_eq!(p.logout_path(), "api/auth/logout");
    }

    #[test]
    fn classic_paths_are_unprefixed() {
        let p = ControllerPlatform::ClassicController;
        assert_eq!(p.api_prefix(), "");
        assert_eq!(p.login_path(), "api/login");
        assert_eq!(p.logout_path(), "api/logout");
    }
}

use once_cell::sync::Lazy;

use crate::protocol::{ClientSdkInfo, ClientSdkPackage};

/// The version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of the library as reported in events.
pub const SDK_NAME: &str = "sentry.rust.host";

/// The protocol version spoken with the store endpoint.
pub const PROTOCOL_VERSION: u16 = 7;

include!(concat!(env!("OUT_DIR"), "/constants.gen.rs"));

/// The user agent sent with every transmission.
pub static USER_AGENT: Lazy<String> = Lazy::new(|| format!("sentry-host/{}", VERSION));

/// The SDK information attached to every event.
pub static SDK_INFO: Lazy<ClientSdkInfo> = Lazy::new(|| ClientSdkInfo {
    name: SDK_NAME.into(),
    version: VERSION.into(),
    packages: vec![ClientSdkPackage {
        name: "cargo:sentry-host".into(),
        version: VERSION.into(),
    }],
    integrations: vec!["log".into()],
});

use std::path::Path;
use std::rc::Rc;

/// Sentinel version string used when the jar's version cannot be determined.
pub const VERSION_UNKNOWN: &str = "unknown";

/// Derives a version identifier from a game jar.
///
/// The real implementation lives in the launcher's java tooling; the library
/// only consumes the contract.
pub trait JarVersionSniffer {
    fn sniff(&self, jar: &Path) -> String;
}

/// Fallback sniffer wired in when no real one is provided. Always reports
/// [`VERSION_UNKNOWN`].
#[derive(Debug, Default, Clone, Copy)]
pub struct NullJarSniffer;

impl JarVersionSniffer for NullJarSniffer {
    fn sniff(&self, _jar: &Path) -> String {
        VERSION_UNKNOWN.to_string()
    }
}

/// Maps a stored icon key (plus the instance name) to the key actually shown.
pub trait IconResolver {
    fn resolve(&self, stored: &str, name: &str) -> String;
}

/// The stock resolver. Instances that never picked an icon get a name-derived
/// one for a couple of well-known pack names; the stored key is never
/// rewritten.
#[derive(Debug, Default, Clone, Copy)]
pub struct EasterEggIconResolver;

impl IconResolver for EasterEggIconResolver {
    fn resolve(&self, stored: &str, name: &str) -> String {
        if stored != "default" {
            return stored.to_string();
        }
        let name = name.to_lowercase();
        if name.contains("btw") || name.contains("better than wolves") {
            "herobrine".to_string()
        } else if name.contains("direwolf") {
            "enderman".to_string()
        } else {
            stored.to_string()
        }
    }
}

/// Collaborators an [`crate::Instance`] consults. Cloning shares the
/// underlying hooks, so one set can serve a whole manager.
#[derive(Clone)]
pub struct InstanceHooks {
    pub sniffer: Rc<dyn JarVersionSniffer>,
    pub icons: Rc<dyn IconResolver>,
}

impl Default for InstanceHooks {
    fn default() -> Self {
        Self {
            sniffer: Rc::new(NullJarSniffer),
            icons: Rc::new(EasterEggIconResolver),
        }
    }
}

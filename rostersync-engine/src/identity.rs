//! Provider address-folding prediction.
//!
//! The remote provider folds addresses under its own mail domains: dots in
//! the local part are ignored, and a `+suffix` is stripped. So
//! `foo.bar+choir@gmail.com` and `foobar@gmail.com` are one mailbox. The
//! provider may hand back ANY display form when listing a group, so the
//! diff must predict the folded form of a computed roster address and
//! compare remote-returned addresses (taken as already folded) against that
//! prediction.
//!
//! A DNS MX lookup could detect folding domains dynamically, but this
//! comparison runs for every (roster entry, remote member) pair, so a
//! configured allow-list is used instead.

/// Equivalence relation between a computed roster address and a
/// remote-reported address, built from the configured folding domains.
#[derive(Debug, Clone)]
pub struct IdentityFolder {
    domains: Vec<String>,
}

impl IdentityFolder {
    pub fn new(domains: Vec<String>) -> Self {
        Self {
            domains: domains.into_iter().map(|d| d.to_lowercase()).collect(),
        }
    }

    /// Predict the provider's folded form of `email`.
    ///
    /// Addresses outside the folding domains are returned unchanged (apart
    /// from lower-casing); the provider compares those verbatim.
    pub fn fold(&self, email: &str) -> String {
        let email = email.to_lowercase();
        let Some((local, domain)) = email.split_once('@') else {
            return email;
        };
        if !self.domains.iter().any(|d| d == domain) {
            return email;
        }

        let local = local.split('+').next().unwrap_or(local);
        let local: String = local.chars().filter(|c| *c != '.').collect();
        format!("{local}@{domain}")
    }

    /// Do `a` and `b` resolve to the same remote mailbox?
    pub fn identical(&self, a: &str, b: &str) -> bool {
        if a == b {
            return true;
        }

        // A string without the delimiter is not an address; never equal.
        if !a.contains('@') || !b.contains('@') {
            return false;
        }

        self.fold(a) == self.fold(b)
    }
}

impl Default for IdentityFolder {
    fn default() -> Self {
        Self::new(rostersync_core::config::default_folding_domains())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

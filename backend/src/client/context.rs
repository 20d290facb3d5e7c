//! What a page stored on the client, and the plan for removing it.
//!
//! Cookies can only be removed by overwriting them with an expired cookie
//! that has the same name, path and domain; browsers also ignore the
//! overwrite when `Secure` or `SameSite` differ from the original. The
//! context therefore records every attribute the page used.

use actix_web::cookie::time::{Duration, OffsetDateTime};
use actix_web::cookie::{Cookie, SameSite};

/// Browser storage area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageArea {
    Local,
    Session,
}

/// A cookie set for the page, with the attributes needed to expire it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCookie {
    pub name: String,
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub same_site: SameSite,
}

impl ClientCookie {
    /// Cookie on `/` with no domain, `Secure` and `SameSite=Lax`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: "/".to_owned(),
            domain: None,
            secure: true,
            same_site: SameSite::Lax,
        }
    }

    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    #[must_use]
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }

    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// An empty cookie with matching attributes, expired at the epoch.
    fn expired(&self) -> Cookie<'static> {
        let mut cookie = Cookie::build(self.name.clone(), "")
            .path(self.path.clone())
            .secure(self.secure)
            .same_site(self.same_site)
            .max_age(Duration::ZERO)
            .expires(OffsetDateTime::UNIX_EPOCH)
            .finish();
        if let Some(domain) = &self.domain {
            cookie.set_domain(domain.clone());
        }
        cookie
    }
}

/// Everything the after-payment page keeps on the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientSessionContext {
    pub local_storage_keys: Vec<String>,
    pub session_storage_keys: Vec<String>,
    pub cookies: Vec<ClientCookie>,
}

impl ClientSessionContext {
    /// Remember a storage key the page wrote.
    pub fn track_storage(&mut self, area: StorageArea, key: impl Into<String>) {
        let key = key.into();
        let keys = match area {
            StorageArea::Local => &mut self.local_storage_keys,
            StorageArea::Session => &mut self.session_storage_keys,
        };
        if !keys.contains(&key) {
            keys.push(key);
        }
    }

    /// Remember a cookie the page set, replacing one with the same name.
    pub fn track_cookie(&mut self, cookie: ClientCookie) {
        self.cookies.retain(|existing| existing.name != cookie.name);
        self.cookies.push(cookie);
    }
}

/// Ordered client-side cleanup derived from a [`ClientSessionContext`].
#[derive(Debug, Clone, PartialEq)]
pub struct TeardownPlan {
    pub clear_storage: Vec<(StorageArea, String)>,
    pub expire_cookies: Vec<Cookie<'static>>,
}

impl TeardownPlan {
    /// `Set-Cookie` values that expire every tracked cookie.
    pub fn set_cookie_headers(&self) -> Vec<String> {
        self.expire_cookies.iter().map(ToString::to_string).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.clear_storage.is_empty() && self.expire_cookies.is_empty()
    }
}

/// Build the cleanup for `context`. Session storage is cleared before local
/// storage, then cookies are expired.
pub fn plan_teardown(context: &ClientSessionContext) -> TeardownPlan {
    let session = context
        .session_storage_keys
        .iter()
        .map(|key| (StorageArea::Session, key.clone()));
    let local = context
        .local_storage_keys
        .iter()
        .map(|key| (StorageArea::Local, key.clone()));
    TeardownPlan {
        clear_storage: session.chain(local).collect(),
        expire_cookies: context.cookies.iter().map(ClientCookie::expired).collect(),
    }
}

//! URL scheme generators and secure-URL resolution.
//!
//! Each URL kind has a `*_scheme` method returning its pattern with placeholders
//! intact, and a concrete method that renders the scheme with literal values. Serving
//! URLs point straight at a stored artifact; processing URLs point at the host
//! application's on-the-fly endpoints (crop, scale, placeholder, blank avatar, zip,
//! expiring links). Each family has an insecure and a secure base URI.

use std::fmt::Display;

use crate::expiring::ExpiringLinkIssuer;
use crate::naming::{ObjectName, DOWNLOAD_SUFFIX};
use crate::template::{Placeholder, TemplateVars};
use crate::AppError;

/// URL family, each with its own base URI pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Serving,
    Processing,
}

/// Whether the request the URL is generated for arrived over a secure connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestSecurity {
    #[default]
    Plain,
    Secure,
}

impl From<bool> for RequestSecurity {
    fn from(secure: bool) -> Self {
        if secure {
            RequestSecurity::Secure
        } else {
            RequestSecurity::Plain
        }
    }
}

/// The four base URIs, each normalised to end with exactly one `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUris {
    serve: String,
    serve_secure: String,
    process: String,
    process_secure: String,
}

impl BaseUris {
    /// Build from configured URIs. `{{bucket}}` in any of them is replaced by the
    /// physical bucket (`container`) now, before any logical bucket is substituted.
    pub fn new(
        serve: &str,
        serve_secure: &str,
        process: &str,
        process_secure: &str,
        container: &str,
    ) -> Self {
        let prepare = |uri: &str| {
            let uri = uri.replace(&Placeholder::Bucket.to_string(), container);
            add_trailing_slash(&uri)
        };

        Self {
            serve: prepare(serve),
            serve_secure: prepare(serve_secure),
            process: prepare(process),
            process_secure: prepare(process_secure),
        }
    }

    pub fn base(&self, family: Family, security: RequestSecurity) -> &str {
        match (family, security) {
            (Family::Serving, RequestSecurity::Plain) => &self.serve,
            (Family::Serving, RequestSecurity::Secure) => &self.serve_secure,
            (Family::Processing, RequestSecurity::Plain) => &self.process,
            (Family::Processing, RequestSecurity::Secure) => &self.process_secure,
        }
    }

    /// Rewrite the family's insecure base prefix to its secure counterpart when the
    /// request is secure.
    ///
    /// Only a leading prefix is ever rewritten. A URL already on the secure base is
    /// returned untouched, which makes the rewrite idempotent.
    pub fn make_secure(&self, url: &str, family: Family, security: RequestSecurity) -> String {
        if security == RequestSecurity::Plain {
            return url.to_string();
        }

        let secure = self.base(family, RequestSecurity::Secure);
        if url.starts_with(secure) {
            return url.to_string();
        }

        match url.strip_prefix(self.base(family, RequestSecurity::Plain)) {
            Some(rest) => format!("{}{}", secure, rest),
            None => url.to_string(),
        }
    }
}

fn add_trailing_slash(uri: &str) -> String {
    format!("{}/", uri.trim_end_matches('/'))
}

/// URL generation shared by every storage driver.
#[derive(Clone)]
pub struct UrlSchemes {
    bases: BaseUris,
    issuer: ExpiringLinkIssuer,
}

impl UrlSchemes {
    pub fn new(bases: BaseUris, issuer: ExpiringLinkIssuer) -> Self {
        Self { bases, issuer }
    }

    pub fn issuer(&self) -> &ExpiringLinkIssuer {
        &self.issuer
    }

    /// Generators bound to the security of one request.
    pub fn for_request(&self, security: impl Into<RequestSecurity>) -> SchemeUrls<'_> {
        SchemeUrls {
            schemes: self,
            security: security.into(),
        }
    }
}

/// URL generators for a single request context.
#[derive(Clone, Copy)]
pub struct SchemeUrls<'a> {
    schemes: &'a UrlSchemes,
    security: RequestSecurity,
}

impl<'a> SchemeUrls<'a> {
    fn process_scheme(&self, path: &str) -> String {
        let bases = &self.schemes.bases;
        let url = add_trailing_slash(&format!(
            "{}{}",
            bases.base(Family::Processing, RequestSecurity::Plain),
            path
        ));
        bases.make_secure(&url, Family::Processing, self.security)
    }

    fn object_vars(object: &str, bucket: &str) -> TemplateVars {
        let name = ObjectName::parse(object);
        TemplateVars::new()
            .set(Placeholder::Bucket, bucket)
            .set(Placeholder::Filename, name.stem())
            .set(Placeholder::Extension, name.extension())
    }

    fn sized_object_vars(
        object: &str,
        bucket: &str,
        width: u32,
        height: u32,
    ) -> TemplateVars {
        Self::object_vars(object, bucket)
            .set(Placeholder::Width, width)
            .set(Placeholder::Height, height)
    }

    /// Scheme of serve URLs. A forced download points at the attachment copy made on
    /// upload rather than the inline one.
    pub fn serve_scheme(&self, force_download: bool) -> String {
        let bases = &self.schemes.bases;
        let mut url = add_trailing_slash(&format!(
            "{}{}",
            bases.base(Family::Serving, RequestSecurity::Plain),
            Placeholder::Bucket
        ));
        url.push_str(&Placeholder::Filename.to_string());
        if force_download {
            url.push_str(DOWNLOAD_SUFFIX);
        }
        url.push_str(&Placeholder::Extension.to_string());

        bases.make_secure(&url, Family::Serving, self.security)
    }

    pub fn serve(&self, object: &str, bucket: &str, force_download: bool) -> String {
        Self::object_vars(object, bucket).render(&self.serve_scheme(force_download))
    }

    /// Serve straight from storage; identical to an inline serve URL.
    pub fn serve_raw(&self, object: &str, bucket: &str) -> String {
        self.serve(object, bucket, false)
    }

    pub fn serve_zipped_scheme(&self) -> String {
        self.process_scheme("zip/{{ids}}/{{hash}}/{{filename}}")
    }

    /// Zip of several objects. `object_ids` is the comma-separated id list.
    pub fn serve_zipped(&self, object_ids: &str, hash: &str, filename: &str) -> String {
        TemplateVars::new()
            .set(Placeholder::Ids, object_ids)
            .set(Placeholder::Hash, hash)
            .set(Placeholder::Filename, filename)
            .render(&self.serve_zipped_scheme())
    }

    pub fn crop_scheme(&self) -> String {
        self.process_scheme("crop/{{width}}/{{height}}/{{bucket}}/{{filename}}{{extension}}")
    }

    pub fn crop(&self, object: &str, bucket: &str, width: u32, height: u32) -> String {
        Self::sized_object_vars(object, bucket, width, height).render(&self.crop_scheme())
    }

    pub fn scale_scheme(&self) -> String {
        self.process_scheme("scale/{{width}}/{{height}}/{{bucket}}/{{filename}}{{extension}}")
    }

    pub fn scale(&self, object: &str, bucket: &str, width: u32, height: u32) -> String {
        Self::sized_object_vars(object, bucket, width, height).render(&self.scale_scheme())
    }

    pub fn placeholder_scheme(&self) -> String {
        self.process_scheme("placeholder/{{width}}/{{height}}/{{border}}")
    }

    pub fn placeholder(&self, width: u32, height: u32, border: u32) -> String {
        TemplateVars::new()
            .set(Placeholder::Width, width)
            .set(Placeholder::Height, height)
            .set(Placeholder::Border, border)
            .render(&self.placeholder_scheme())
    }

    pub fn blank_avatar_scheme(&self) -> String {
        self.process_scheme("blank_avatar/{{width}}/{{height}}/{{sex}}")
    }

    /// `sex` may be empty for a neutral avatar.
    pub fn blank_avatar(&self, width: u32, height: u32, sex: impl Display) -> String {
        TemplateVars::new()
            .set(Placeholder::Width, width)
            .set(Placeholder::Height, height)
            .set(Placeholder::Sex, sex)
            .render(&self.blank_avatar_scheme())
    }

    pub fn expiring_scheme(&self) -> String {
        let bases = &self.schemes.bases;
        let url = format!(
            "{}serve?token={}&dl={}",
            bases.base(Family::Processing, RequestSecurity::Plain),
            Placeholder::Token,
            Placeholder::Download
        );
        bases.make_secure(&url, Family::Processing, self.security)
    }

    /// Time-limited link to `object` in `bucket`.
    pub fn expiring(
        &self,
        object: &str,
        bucket: &str,
        ttl_secs: u64,
        force_download: bool,
    ) -> Result<String, AppError> {
        let token = self.schemes.issuer.issue(bucket, object, ttl_secs)?;
        Ok(TemplateVars::new()
            .set(Placeholder::Token, token)
            .set(Placeholder::Download, u8::from(force_download))
            .render(&self.expiring_scheme()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expiring::ExpiringToken;
    use crate::EncryptionService;
    use std::sync::Arc;

    const SERVE: &str = "http://cdn.example.com";
    const SERVE_SECURE: &str = "https://cdn.example.com";
    const PROCESS: &str = "http://example.com/cdn";
    const PROCESS_SECURE: &str = "https://example.com/cdn";

    fn schemes() -> UrlSchemes {
        let bases = BaseUris::new(SERVE, SERVE_SECURE, PROCESS, PROCESS_SECURE, "phys");
        let cipher = Arc::new(EncryptionService::from_secret("s3cret").unwrap());
        UrlSchemes::new(bases, ExpiringLinkIssuer::new(cipher))
    }

    #[test]
    fn serve_urls_for_inline_and_download() {
        let schemes = schemes();
        let urls = schemes.for_request(false);
        assert_eq!(
            urls.serve("Pic.PNG", "avatars", false),
            "http://cdn.example.com/avatars/pic.png"
        );
        assert_eq!(
            urls.serve("Pic.PNG", "avatars", true),
            "http://cdn.example.com/avatars/pic-download.png"
        );
        assert_eq!(
            urls.serve_raw("Pic.PNG", "avatars"),
            urls.serve("Pic.PNG", "avatars", false)
        );
    }

    #[test]
    fn secure_requests_use_secure_serving_base() {
        let schemes = schemes();
        assert_eq!(
            schemes.for_request(true).serve("Pic.PNG", "avatars", false),
            "https://cdn.example.com/avatars/pic.png"
        );
    }

    #[test]
    fn schemes_keep_placeholders() {
        let schemes = schemes();
        let urls = schemes.for_request(RequestSecurity::Plain);
        assert_eq!(
            urls.serve_scheme(false),
            "http://cdn.example.com/{{bucket}}/{{filename}}{{extension}}"
        );
        assert_eq!(
            urls.crop_scheme(),
            "http://example.com/cdn/crop/{{width}}/{{height}}/{{bucket}}/{{filename}}{{extension}}/"
        );
        assert_eq!(
            urls.expiring_scheme(),
            "http://example.com/cdn/serve?token={{token}}&dl={{download}}"
        );
    }

    #[test]
    fn processing_urls() {
        let schemes = schemes();
        let urls = schemes.for_request(false);
        assert_eq!(
            urls.crop("Pic.PNG", "avatars", 100, 50),
            "http://example.com/cdn/crop/100/50/avatars/pic.png/"
        );
        assert_eq!(
            urls.scale("Pic.PNG", "avatars", 100, 50),
            "http://example.com/cdn/scale/100/50/avatars/pic.png/"
        );
        assert_eq!(
            urls.placeholder(10, 20, 1),
            "http://example.com/cdn/placeholder/10/20/1/"
        );
        assert_eq!(
            urls.blank_avatar(10, 20, ""),
            "http://example.com/cdn/blank_avatar/10/20//"
        );
        assert_eq!(
            urls.serve_zipped("1,2", "abc", "My Files.zip"),
            "http://example.com/cdn/zip/1%2C2/abc/My%20Files.zip/"
        );
    }

    #[test]
    fn secure_processing_urls() {
        let schemes = schemes();
        assert_eq!(
            schemes.for_request(true).placeholder(10, 20, 0),
            "https://example.com/cdn/placeholder/10/20/0/"
        );
    }

    #[test]
    fn expiring_url_carries_openable_token() {
        let schemes = schemes();
        let url = schemes
            .for_request(true)
            .expiring("pic.png", "avatars", 60, true)
            .unwrap();

        let prefix = "https://example.com/cdn/serve?token=";
        assert!(url.starts_with(prefix));
        assert!(url.ends_with("&dl=1"));

        let encoded = &url[prefix.len()..url.len() - "&dl=1".len()];
        let token_str = urlencoding::decode(encoded).unwrap();
        let token = ExpiringToken::open(schemes.issuer().cipher(), &token_str).unwrap();
        assert_eq!(token.bucket, "avatars");
        assert_eq!(token.object, "pic.png");
        assert!(token.verify(schemes.issuer().cipher(), token.issued_at));
    }

    #[test]
    fn make_secure_is_idempotent_and_prefix_only() {
        let bases = BaseUris::new(SERVE, SERVE_SECURE, PROCESS, PROCESS_SECURE, "phys");
        let url = "http://example.com/cdn/crop/http://example.com/cdn/";
        let once = bases.make_secure(url, Family::Processing, RequestSecurity::Secure);
        let twice = bases.make_secure(&once, Family::Processing, RequestSecurity::Secure);

        assert_eq!(once, "https://example.com/cdn/crop/http://example.com/cdn/");
        assert_eq!(once, twice);
    }

    #[test]
    fn make_secure_never_mixes_families() {
        let bases = BaseUris::new(SERVE, SERVE_SECURE, PROCESS, PROCESS_SECURE, "phys");
        let serve_url = "http://cdn.example.com/avatars/pic.png";
        assert_eq!(
            bases.make_secure(serve_url, Family::Processing, RequestSecurity::Secure),
            serve_url
        );
    }

    #[test]
    fn make_secure_is_idempotent_when_secure_base_extends_plain() {
        let bases = BaseUris::new(
            "http://x.com",
            "http://x.com/secure",
            PROCESS,
            PROCESS_SECURE,
            "phys",
        );
        let once = bases.make_secure("http://x.com/a", Family::Serving, RequestSecurity::Secure);
        let twice = bases.make_secure(&once, Family::Serving, RequestSecurity::Secure);
        assert_eq!(once, "http://x.com/secure/a");
        assert_eq!(once, twice);
    }

    #[test]
    fn bucket_placeholder_in_base_is_physical_bucket() {
        let bases = BaseUris::new(
            "http://{{bucket}}.storage.googleapis.com",
            "https://{{bucket}}.storage.googleapis.com/",
            PROCESS,
            PROCESS_SECURE,
            "my-bucket",
        );
        assert_eq!(
            bases.base(Family::Serving, RequestSecurity::Plain),
            "http://my-bucket.storage.googleapis.com/"
        );
        assert_eq!(
            bases.base(Family::Serving, RequestSecurity::Secure),
            "https://my-bucket.storage.googleapis.com/"
        );
    }
}

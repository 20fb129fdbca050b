//! Certificate Authority management for the MITM proxy.
//!
//! Generates, persists and loads the root CA used to sign per-host leaf
//! certificates for the intercepted location service.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Duration, Utc};
use hudsucker::certificate_authority::RcgenAuthority;
use hudsucker::rcgen::{
    date_time_ymd, BasicConstraints, CertificateParams, DistinguishedName, DnType,
    ExtendedKeyUsagePurpose, IsCa, Issuer, KeyPair, KeyUsagePurpose,
};
use hudsucker::rustls::crypto::aws_lc_rs::default_provider;

pub use crate::error::CaManagerError;

/// CA certificate and key file names.
const CA_CERT_FILENAME: &str = "wloc-ca.crt";
const CA_KEY_FILENAME: &str = "wloc-ca.key";

/// Subject of generated CA certificates.
const CA_COMMON_NAME: &str = "Location Spoofer CA";
const CA_ORGANIZATION: &str = "Location Spoofer";

/// Validity of generated CA certificates.
const CA_VALIDITY_DAYS: i64 = 365;

/// Leaf certificates kept in the authority's cache.
const LEAF_CACHE_SIZE: u64 = 1000;

/// PEM-encoded CA certificate and PKCS#8 private key.
#[derive(Clone)]
pub struct CaMaterial {
    cert_pem: String,
    key_pem: String,
    /// First certificate of `cert_pem`, re-encoded for download.
    download_pem: String,
}

impl std::fmt::Debug for CaMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaMaterial")
            .field("cert_pem", &format!("{} bytes", self.cert_pem.len()))
            .field("key_pem", &"<redacted>")
            .finish()
    }
}

impl CaMaterial {
    /// Parses and validates CA material.
    pub fn from_pem(
        cert_pem: impl Into<String>,
        key_pem: impl Into<String>,
    ) -> Result<Self, CaManagerError> {
        let cert_pem = cert_pem.into();
        let key_pem = key_pem.into();

        let blocks =
            pem::parse_many(&cert_pem).map_err(|e| CaManagerError::Parse(e.to_string()))?;
        let cert = blocks
            .iter()
            .find(|block| block.tag() == "CERTIFICATE")
            .ok_or_else(|| CaManagerError::Parse("no CERTIFICATE block found".into()))?;
        let download_pem = pem::encode(cert);

        let material = Self {
            cert_pem,
            key_pem,
            download_pem,
        };
        // Fail here rather than on the first intercepted connection.
        material.issuer()?;
        Ok(material)
    }

    /// Returns the CA certificate PEM as provided.
    pub fn cert_pem(&self) -> &str {
        &self.cert_pem
    }

    /// Returns the CA private key PEM.
    pub fn key_pem(&self) -> &str {
        &self.key_pem
    }

    /// Returns the CA certificate served to clients for installation.
    pub fn download_pem(&self) -> &str {
        &self.download_pem
    }

    /// Builds the hudsucker authority that mints per-host certificates.
    pub fn authority(&self) -> Result<RcgenAuthority, CaManagerError> {
        Ok(RcgenAuthority::new(
            self.issuer()?,
            LEAF_CACHE_SIZE,
            default_provider(),
        ))
    }

    fn issuer(&self) -> Result<Issuer<'static, KeyPair>, CaManagerError> {
        let key_pair =
            KeyPair::from_pem(&self.key_pem).map_err(|e| CaManagerError::Parse(e.to_string()))?;
        Issuer::from_ca_cert_pem(&self.cert_pem, key_pair)
            .map_err(|e| CaManagerError::Parse(e.to_string()))
    }
}

/// Generates a new self-signed root CA.
pub fn generate_ca() -> Result<CaMaterial, CaManagerError> {
    let key_pair = KeyPair::generate().map_err(|e| CaManagerError::Generation(e.to_string()))?;

    let mut params = CertificateParams::default();

    let mut name = DistinguishedName::new();
    name.push(DnType::CommonName, CA_COMMON_NAME);
    name.push(DnType::OrganizationName, CA_ORGANIZATION);
    name.push(DnType::CountryName, "US");
    params.distinguished_name = name;

    let now = Utc::now();
    let expires = now + Duration::days(CA_VALIDITY_DAYS);
    params.not_before = date_time_ymd(now.year(), now.month() as u8, now.day() as u8);
    params.not_after = date_time_ymd(
        expires.year(),
        expires.month() as u8,
        expires.day() as u8,
    );

    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
    ];
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];

    let cert = params
        .self_signed(&key_pair)
        .map_err(|e| CaManagerError::Generation(e.to_string()))?;

    CaMaterial::from_pem(cert.pem(), key_pair.serialize_pem())
}

/// Manages the root CA files on disk.
#[derive(Debug, Clone)]
pub struct CaManager {
    /// Path to the CA directory.
    ca_dir: PathBuf,
}

impl CaManager {
    /// Creates a new CA manager with the given directory.
    pub fn new(ca_dir: impl AsRef<Path>) -> Self {
        Self {
            ca_dir: ca_dir.as_ref().to_path_buf(),
        }
    }

    /// Creates a CA manager using the default data directory.
    pub fn with_default_dir() -> Result<Self, CaManagerError> {
        let project_dirs = directories::ProjectDirs::from("dev", "wloc-spoof", "wloc-spoof")
            .ok_or_else(|| CaManagerError::Generation("Failed to get project dirs".into()))?;

        Ok(Self::new(project_dirs.data_dir().join("ca")))
    }

    /// Returns the path to the CA certificate file.
    pub fn cert_path(&self) -> PathBuf {
        self.ca_dir.join(CA_CERT_FILENAME)
    }

    /// Returns the path to the CA private key file.
    pub fn key_path(&self) -> PathBuf {
        self.ca_dir.join(CA_KEY_FILENAME)
    }

    /// Checks if the CA certificate exists.
    pub fn ca_exists(&self) -> bool {
        self.cert_path().exists() && self.key_path().exists()
    }

    /// Loads the stored CA, generating and storing a new one if missing.
    pub fn ensure_ca(&self) -> Result<CaMaterial, CaManagerError> {
        if self.ca_exists() {
            return self.load();
        }
        let material = generate_ca()?;
        self.store(&material)?;
        tracing::info!("Generated new CA certificate at {:?}", self.cert_path());
        Ok(material)
    }

    /// Loads the stored CA.
    pub fn load(&self) -> Result<CaMaterial, CaManagerError> {
        let cert_pem = fs::read_to_string(self.cert_path())?;
        let key_pem = fs::read_to_string(self.key_path())?;
        CaMaterial::from_pem(cert_pem, key_pem)
    }

    /// Writes CA material to the directory, replacing existing files.
    pub fn store(&self, material: &CaMaterial) -> Result<(), CaManagerError> {
        fs::create_dir_all(&self.ca_dir)?;
        fs::write(self.cert_path(), material.cert_pem())
            .map_err(|e| CaManagerError::Write(e.to_string()))?;
        fs::write(self.key_path(), material.key_pem())
            .map_err(|e| CaManagerError::Write(e.to_string()))?;
        Ok(())
    }
}

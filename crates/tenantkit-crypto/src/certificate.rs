//! X.509 certificate serial tokens and certificate helpers.
//!
//! Public-key-certificate mode of the open API sends two fingerprints with
//! every request:
//!
//! - `app_cert_sn`: MD5 hex of the leaf certificate's issuer principal
//!   followed by its decimal serial number;
//! - `alipay_root_cert_sn`: the same token for every RSA-signed certificate
//!   in the platform root bundle, joined with `_` in bundle order.
//!
//! The issuer principal is rendered as `shortName=value` pairs in reverse
//! order of appearance in the certificate, comma separated.

use num_bigint::BigUint;
use x509_parser::certificate::X509Certificate;
use x509_parser::pem::Pem;
use x509_parser::x509::X509Name;

use tenantkit_primitives::hash::md5_hex;

use crate::keys::PublicKey;
use crate::CryptoError;

/// Signature algorithm OIDs under this arc are RSA (`sha1WithRSAEncryption`,
/// `sha256WithRSAEncryption`, ...).
pub const RSA_SIGNATURE_OID_PREFIX: &str = "1.2.840.113549.1.1";

/// Compute the serial token for a leaf certificate or a root bundle.
///
/// # Arguments
/// * `pem` - One or more PEM certificates.
/// * `root_bundle` - When true, every RSA-signed certificate contributes a
///   token and the tokens are joined with `_`. When false, only the first
///   certificate is used.
pub fn resolve_serial(pem: &str, root_bundle: bool) -> Result<String, CryptoError> {
    if root_bundle {
        root_cert_sn(pem)
    } else {
        app_cert_sn(pem)
    }
}

/// Serial token of the first certificate in `pem`.
pub fn app_cert_sn(pem: &str) -> Result<String, CryptoError> {
    let blocks = read_pems(pem.as_bytes())?;
    let first = blocks
        .first()
        .ok_or_else(|| CryptoError::Certificate("no certificate in PEM input".to_string()))?;
    let cert = parse(first)?;
    serial_token(&cert)
}

/// Joined serial tokens of every RSA-signed certificate in a root bundle.
///
/// Certificates signed with other algorithms (EC roots in the same bundle)
/// are skipped, so a bundle of K RSA-signed certificates yields K tokens and
/// one with none yields the empty string. Input with no certificate at all
/// is an error.
pub fn root_cert_sn(pem: &str) -> Result<String, CryptoError> {
    let blocks = read_pems(pem.as_bytes())?;
    if blocks.is_empty() {
        return Err(CryptoError::Certificate("no certificate in PEM input".to_string()));
    }
    let mut tokens = Vec::new();
    for block in blocks {
        let cert = parse(&block)?;
        let oid = cert.signature_algorithm.algorithm.to_id_string();
        if !is_rsa_family(&oid) {
            tracing::trace!(oid = %oid, "skipping non-RSA certificate in root bundle");
            continue;
        }
        tokens.push(serial_token(&cert)?);
    }
    Ok(tokens.join("_"))
}

/// Merchant certificate `serial_no`: the leaf serial as upper-case hex.
pub fn merchant_serial_no(pem: &str) -> Result<String, CryptoError> {
    let blocks = read_pems(pem.as_bytes())?;
    let first = blocks
        .first()
        .ok_or_else(|| CryptoError::Certificate("no certificate in PEM input".to_string()))?;
    let cert = parse(first)?;
    Ok(format!("{:X}", BigUint::from_bytes_be(cert.raw_serial())))
}

/// Extract the RSA public key of the first certificate in `pem`.
pub fn public_key_from_certificate(pem: &[u8]) -> Result<PublicKey, CryptoError> {
    let blocks = read_pems(pem)?;
    let first = blocks
        .first()
        .ok_or_else(|| CryptoError::Certificate("no certificate in PEM input".to_string()))?;
    let cert = parse(first)?;
    PublicKey::from_spki_der(cert.public_key().raw)
}

fn is_rsa_family(oid: &str) -> bool {
    oid == RSA_SIGNATURE_OID_PREFIX || oid.starts_with(&format!("{RSA_SIGNATURE_OID_PREFIX}."))
}

fn read_pems(input: &[u8]) -> Result<Vec<Pem>, CryptoError> {
    let pems = Pem::iter_from_buffer(input)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CryptoError::Certificate(e.to_string()))?;
    Ok(pems
        .into_iter()
        .filter(|p| p.label == "CERTIFICATE")
        .collect())
}

fn parse(pem: &Pem) -> Result<X509Certificate<'_>, CryptoError> {
    pem.parse_x509()
        .map_err(|e| CryptoError::Certificate(e.to_string()))
}

fn serial_token(cert: &X509Certificate<'_>) -> Result<String, CryptoError> {
    let principal = issuer_principal(cert.issuer())?;
    let serial = BigUint::from_bytes_be(cert.raw_serial()).to_str_radix(10);
    Ok(md5_hex(format!("{principal}{serial}").as_bytes()))
}

fn issuer_principal(name: &X509Name<'_>) -> Result<String, CryptoError> {
    let mut parts = Vec::new();
    for attr in name.iter_attributes() {
        let oid = attr.attr_type().to_id_string();
        let value = attr
            .as_str()
            .map_err(|e| CryptoError::Certificate(format!("issuer attribute {oid}: {e}")))?;
        parts.push(format!("{}={value}", short_name(&oid)));
    }
    parts.reverse();
    Ok(parts.join(","))
}

fn short_name(oid: &str) -> &str {
    match oid {
        "2.5.4.3" => "CN",
        "2.5.4.6" => "C",
        "2.5.4.7" => "L",
        "2.5.4.8" => "ST",
        "2.5.4.9" => "STREET",
        "2.5.4.10" => "O",
        "2.5.4.11" => "OU",
        "0.9.2342.19200300.100.1.25" => "DC",
        "0.9.2342.19200300.100.1.1" => "UID",
        "1.2.840.113549.1.9.1" => "E",
        other => other,
    }
}

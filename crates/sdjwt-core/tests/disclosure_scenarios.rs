//! End-to-end disclosure scenarios over the public `sdjwt-core` API:
//! pack, sign, serialize, present, bind, parse, unpack.

use std::sync::atomic::{AtomicUsize, Ordering};

use sdjwt_core::encoding::b64url_encode;
use sdjwt_core::{
    pack, DisclosureFrame, Hasher, HasherAndAlg, Jwt, KbExpectations, KeyBindingClaims,
    KeyBindingVerifier, PresentationFrame, SaltGenerator, SdJwt, SdJwtError, SdJwtResult, Signer,
};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

struct Sha256Only;

impl Hasher for Sha256Only {
    fn hash(&self, data: &[u8], alg: &str) -> SdJwtResult<Vec<u8>> {
        match alg {
            "sha-256" => Ok(Sha256::digest(data).to_vec()),
            other => Err(SdJwtError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

#[derive(Default)]
struct Counter(AtomicUsize);

impl SaltGenerator for Counter {
    fn generate(&self, _length: usize) -> SdJwtResult<String> {
        Ok(format!("salt{}", self.0.fetch_add(1, Ordering::SeqCst)))
    }
}

/// Keyed digest standing in for a real signature.
struct Mac(&'static str);

impl Signer for Mac {
    fn sign(&self, data: &str) -> SdJwtResult<String> {
        Ok(b64url_encode(Sha256::digest(format!("{}|{data}", self.0))))
    }
}

impl KeyBindingVerifier for Mac {
    fn verify(&self, data: &str, signature: &str, _issuer_claims: &Value) -> SdJwtResult<bool> {
        Ok(self.sign(data)? == signature)
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn issue(claims: Value, frame: Value) -> String {
    let frame = DisclosureFrame::try_from(frame).unwrap();
    let packed = pack(
        &claims,
        Some(&frame),
        HasherAndAlg::new(&Sha256Only, "sha-256"),
        &Counter::default(),
    )
    .unwrap();
    let mut payload = object(packed.claims);
    payload.insert("_sd_alg".to_string(), json!("sha-256"));
    let header = object(json!({"typ": "sd-jwt", "alg": "HS256"}));
    let jwt = Jwt::new(header, payload).sign(&Mac("issuer")).unwrap();
    SdJwt::new(jwt, packed.disclosures, None).encode().unwrap()
}

#[test]
fn concrete_scenario() {
    let compact = issue(
        json!({"a": "x", "b": {"c": "y"}}),
        json!({"_sd": ["a"], "b": {"_sd": ["c"]}}),
    );
    let sd = SdJwt::decode(&compact).unwrap();
    assert_eq!(sd.disclosures.len(), 2);
    assert_eq!(sd.jwt.payload()["_sd"].as_array().unwrap().len(), 1);
    assert_eq!(sd.jwt.payload()["b"]["_sd"].as_array().unwrap().len(), 1);
    assert_eq!(
        sd.presentable_keys(&Sha256Only).unwrap(),
        vec!["a".to_string(), "b.c".to_string()]
    );

    let frame = PresentationFrame::try_from(json!({"b": {"c": true}})).unwrap();
    let presented = sd.present(&frame.paths(), &Sha256Only).unwrap();
    assert_eq!(presented.claims(&Sha256Only).unwrap(), json!({"b": {"c": "y"}}));
}

#[test]
fn concrete_scenario_presenting_top_level_claim() {
    let compact = issue(
        json!({"a": "x", "b": {"c": "y"}}),
        json!({"_sd": ["a"], "b": {"_sd": ["c"]}}),
    );
    let presented = SdJwt::decode(&compact)
        .unwrap()
        .present(&["a"], &Sha256Only)
        .unwrap();

    let wire = presented.encode().unwrap();
    let segments: Vec<&str> = wire.split('~').collect();
    assert_eq!(segments.len(), 3);
    assert!(!segments[1].is_empty());
    assert!(segments[2].is_empty());

    let reparsed = SdJwt::decode(&wire).unwrap();
    assert_eq!(reparsed.disclosures.len(), 1);
    assert_eq!(reparsed.disclosures[0].key(), Some("a"));
    assert_eq!(
        reparsed.claims(&Sha256Only).unwrap(),
        json!({"a": "x", "b": {}})
    );
}

#[test]
fn bad_path_scenario() {
    let sd = SdJwt::decode(&issue(json!({"a": "x"}), json!({"_sd": ["a"]}))).unwrap();
    let err = sd.present(&["x.y"], &Sha256Only).unwrap_err();
    assert_eq!(err.code(), "policy_violation");
}

#[test]
fn array_scenario() {
    let sd = SdJwt::decode(&issue(
        json!({"arr": ["p", "q", "r"]}),
        json!({"arr": {"_sd": [0, 2]}}),
    ))
    .unwrap();
    let arr = sd.jwt.payload()["arr"].as_array().unwrap();
    assert_eq!(arr.len(), 3);
    assert_eq!(arr[1], json!("q"));
    let presented = sd.present(&["arr.2"], &Sha256Only).unwrap();
    assert_eq!(
        presented.claims(&Sha256Only).unwrap(),
        json!({"arr": ["q", "r"]})
    );
}

#[test]
fn decoys_are_indistinguishable() {
    let claims = json!({"a": 1, "b": 2, "list": [1]});
    let compact = issue(
        claims.clone(),
        json!({"_sd": ["a", "b"], "_sd_decoy": 5, "list": {"_sd_decoy": 2}}),
    );
    let sd = SdJwt::decode(&compact).unwrap();
    let digests = sd.jwt.payload()["_sd"].as_array().unwrap();
    assert_eq!(digests.len(), 7);
    for d in digests {
        let d = d.as_str().unwrap();
        assert_eq!(d.len(), 43, "sha-256 digests are 43 base64url chars");
        assert!(d.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_'));
    }
    assert_eq!(sd.jwt.payload()["list"].as_array().unwrap().len(), 3);
    assert_eq!(sd.disclosures.len(), 2);
    assert_eq!(sd.claims(&Sha256Only).unwrap(), claims);
}

#[test]
fn sd_hash_binds_the_exact_presentation() {
    let sd = SdJwt::decode(&issue(
        json!({"a": 1, "b": 2}),
        json!({"_sd": ["a", "b"]}),
    ))
    .unwrap();
    let holder = Mac("holder");
    let presented = sd
        .present(&["a"], &Sha256Only)
        .unwrap()
        .with_key_binding(
            &KeyBindingClaims::new(1_700_000_000, "verifier", "nonce-1"),
            &holder,
            "HS256",
            &Sha256Only,
        )
        .unwrap();
    let compact = presented.encode().unwrap();

    let received = SdJwt::decode(&compact).unwrap();
    let issuer_claims = received.claims(&Sha256Only).unwrap();
    received
        .verify_key_binding(&holder, &issuer_claims, &Sha256Only, KbExpectations::default())
        .unwrap();

    // Smuggle the withheld disclosure in after binding.
    let mut tampered = received.clone();
    tampered.disclosures.push(sd.disclosures[1].clone());
    let err = tampered
        .verify_key_binding(&holder, &issuer_claims, &Sha256Only, KbExpectations::default())
        .unwrap_err();
    assert!(matches!(err, SdJwtError::SdHashMismatch));
}

#[test]
fn tampered_disclosure_is_not_matched() {
    let compact = issue(json!({"a": "x"}), json!({"_sd": ["a"]}));
    let sd = SdJwt::decode(&compact).unwrap();
    let forged = sdjwt_core::Disclosure::object_property(
        sd.disclosures[0].salt(),
        "a",
        json!("forged"),
    );
    let tampered = SdJwt::new(sd.jwt.clone(), vec![forged], None);
    let unpacked = tampered.unpack(&Sha256Only).unwrap();
    assert_eq!(unpacked.claims, json!({}));
    assert_eq!(unpacked.unreferenced.len(), 1);
}

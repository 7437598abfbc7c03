//! SQLite-backed profile store with AES-GCM encryption of the biometric columns.
//! Key derived from a caller-supplied secret (in production: a KMS or keystore secret).

use super::{check_expected, ProfileStore};
use crate::decision::AttemptRecord;
use crate::enrollment::EnrollmentProfile;
use crate::error::{AuthError, Result};
use crate::features::FeatureVector;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, TimeZone, Utc};
use rand::RngCore;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

fn derive_key(seed: &[u8]) -> [u8; KEY_LEN] {
    use ring::digest;
    let mut out = [0u8; KEY_LEN];
    let h = digest::digest(&digest::SHA256, seed);
    out[..h.as_ref().len().min(KEY_LEN)].copy_from_slice(h.as_ref());
    out
}

fn encrypt(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<String> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| AuthError::Storage(format!("cipher init: {}", e)))?;
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);
    let ciphertext = cipher
        .encrypt((&nonce).into(), plaintext)
        .map_err(|_| AuthError::Storage("encryption failed".into()))?;
    let mut out = nonce.to_vec();
    out.extend(ciphertext);
    Ok(BASE64.encode(&out))
}

fn decrypt(key: &[u8; KEY_LEN], encoded: &str) -> Result<Vec<u8>> {
    let raw = BASE64
        .decode(encoded)
        .map_err(|e| AuthError::Storage(format!("bad column encoding: {}", e)))?;
    if raw.len() < NONCE_LEN {
        return Err(AuthError::Storage("payload too short".into()));
    }
    let (nonce, ct) = raw.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| AuthError::Storage(format!("cipher init: {}", e)))?;
    cipher
        .decrypt(nonce.into(), ct)
        .map_err(|_| AuthError::Storage("decryption failed (wrong secret?)".into()))
}

fn decrypt_string(key: &[u8; KEY_LEN], encoded: &str) -> Result<String> {
    String::from_utf8(decrypt(key, encoded)?)
        .map_err(|e| AuthError::Storage(format!("column is not utf-8: {}", e)))
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| AuthError::Storage(format!("timestamp out of range: {}", ms)))
}

pub struct SecureStore {
    conn: Mutex<Connection>,
    key: [u8; KEY_LEN],
}

impl SecureStore {
    /// Open or create DB at path. Key is derived from `secret`.
    pub fn open(path: &Path, secret: &[u8]) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                identity TEXT PRIMARY KEY,
                sample_count INTEGER NOT NULL,
                threshold REAL NOT NULL,
                device_type TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                vectors_enc TEXT NOT NULL,
                model_enc TEXT
            );
            CREATE TABLE IF NOT EXISTS auth_attempts (
                id TEXT PRIMARY KEY,
                identity TEXT NOT NULL,
                ts INTEGER NOT NULL,
                confidence REAL NOT NULL,
                accepted INTEGER NOT NULL,
                method TEXT NOT NULL,
                device_type TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_attempts_identity_ts ON auth_attempts(identity, ts);
            "#,
        )?;
        let key = derive_key(secret);
        Ok(Self {
            conn: Mutex::new(conn),
            key,
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AuthError::Storage("connection lock poisoned".into()))
    }
}

impl ProfileStore for SecureStore {
    fn load_profile(&self, identity: &str) -> Result<Option<EnrollmentProfile>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT threshold, device_type, created_at, vectors_enc, model_enc
                 FROM profiles WHERE identity = ?1",
                params![identity],
                |row| {
                    Ok((
                        row.get::<_, f64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<String>>(4)?,
                    ))
                },
            )
            .optional()?;
        let Some((threshold, device_type, created_at, vectors_enc, model_enc)) = row else {
            return Ok(None);
        };

        let vectors: Vec<FeatureVector> =
            serde_json::from_str(&decrypt_string(&self.key, &vectors_enc)?)?;
        let model = model_enc
            .map(|enc| decrypt_string(&self.key, &enc))
            .transpose()?;
        Ok(Some(EnrollmentProfile::from_parts(
            identity.to_string(),
            vectors,
            threshold,
            model,
            device_type,
            from_millis(created_at)?,
        )))
    }

    fn save_profile(
        &self,
        profile: &EnrollmentProfile,
        expected_samples: Option<usize>,
    ) -> Result<()> {
        let vectors_enc = encrypt(&self.key, serde_json::to_string(profile.vectors())?.as_bytes())?;
        let model_enc = profile
            .model_artifact()
            .map(|m| encrypt(&self.key, m.as_bytes()))
            .transpose()?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let found: Option<i64> = tx
            .query_row(
                "SELECT sample_count FROM profiles WHERE identity = ?1",
                params![profile.identity],
                |row| row.get(0),
            )
            .optional()?;
        check_expected(
            &profile.identity,
            expected_samples,
            found.map(|n| n as usize),
        )?;
        tx.execute(
            "INSERT OR REPLACE INTO profiles
             (identity, sample_count, threshold, device_type, created_at, vectors_enc, model_enc)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                profile.identity,
                profile.sample_count() as i64,
                profile.threshold,
                profile.device_type,
                profile.created_at.timestamp_millis(),
                vectors_enc,
                model_enc,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn record_attempt(&self, attempt: &AttemptRecord) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO auth_attempts (id, identity, ts, confidence, accepted, method, device_type)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                attempt.id,
                attempt.identity,
                attempt.ts.timestamp_millis(),
                attempt.confidence,
                attempt.accepted,
                attempt.method.as_str(),
                attempt.device_type,
            ],
        )?;
        Ok(())
    }

    fn attempts(&self, identity: &str, limit: usize) -> Result<Vec<AttemptRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, ts, confidence, accepted, method, device_type FROM auth_attempts
             WHERE identity = ?1 ORDER BY ts DESC, rowid DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![identity, limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, bool>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, ts, confidence, accepted, method, device_type) = row?;
            out.push(AttemptRecord {
                id,
                identity: identity.to_string(),
                confidence,
                accepted,
                method: method.parse().map_err(AuthError::Storage)?,
                device_type,
                ts: from_millis(ts)?,
            });
        }
        Ok(out)
    }

    fn prune_attempts_before(&self, ts: i64) -> Result<u64> {
        let n = self
            .conn()?
            .execute("DELETE FROM auth_attempts WHERE ts < ?1", params![ts])?;
        Ok(n as u64)
    }
}

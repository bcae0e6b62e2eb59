//! The Reed-Solomon codec.
//!
//! [`ReedSolomon::new(k, m)`](ReedSolomon::new) builds an `(n x k)`
//! encoding matrix (`n = k + m`): a Vandermonde matrix post-multiplied by
//! the inverse of its own top `k x k` block, so the top `k` rows are the
//! identity and the data shards are literally the input rows. The code is
//! MDS: any `k` of the `n` shards reconstruct the original bytes.

use bytes::Bytes;
use tracing::debug;

use crate::error::CodecError;
use crate::field::Gf256;
use crate::matrix::Matrix;

/// A stateless Reed-Solomon encoder/decoder with fixed `(k, m)`.
pub struct ReedSolomon {
    k: usize,
    m: usize,
    encoding: Matrix,
}

impl ReedSolomon {
    /// Build a codec for `k` data shards and `m` parity shards.
    ///
    /// Fails with [`CodecError::InvalidParameters`] when `k` is zero or
    /// `k + m` exceeds the field size.
    pub fn new(k: usize, m: usize) -> Result<Self, CodecError> {
        if k == 0 {
            return Err(CodecError::InvalidParameters {
                reason: "data shard count must be at least 1".to_string(),
            });
        }
        let n = k + m;
        if n > 256 {
            return Err(CodecError::InvalidParameters {
                reason: format!("total shard count {n} exceeds GF(2^8) capacity"),
            });
        }

        let vandermonde = Matrix::vandermonde(n, k);
        let top_inverse = vandermonde.top_square(k).invert()?;
        let encoding = vandermonde.times(&top_inverse);

        debug_assert_eq!(encoding.top_square(k), Matrix::identity(k));

        Ok(Self { k, m, encoding })
    }

    /// Number of data shards.
    pub fn data_shards(&self) -> usize {
        self.k
    }

    /// Number of parity shards.
    pub fn parity_shards(&self) -> usize {
        self.m
    }

    /// Total shard count `n = k + m`.
    pub fn total_shards(&self) -> usize {
        self.k + self.m
    }

    /// Shard length for an input of `len` bytes: `ceil(len / k)`.
    pub fn shard_size(&self, len: usize) -> usize {
        len.div_ceil(self.k)
    }

    /// Encode a byte sequence into `n` equal-length shards.
    ///
    /// Data shards `0..k` carry the input bytes in order, the last data
    /// shard zero-padded to `shard_size`; parity shards `k..n` are
    /// derived. Identical input produces byte-identical output. An empty
    /// input yields `n` empty shards.
    pub fn encode(&self, data: &[u8]) -> Vec<Bytes> {
        let n = self.total_shards();
        let shard_size = self.shard_size(data.len());

        // Lay the input out as k rows, zero-padding the tail.
        let mut rows: Vec<Vec<u8>> = Vec::with_capacity(n);
        for i in 0..self.k {
            let start = (i * shard_size).min(data.len());
            let end = ((i + 1) * shard_size).min(data.len());
            let mut row = Vec::with_capacity(shard_size);
            row.extend_from_slice(&data[start..end]);
            row.resize(shard_size, 0);
            rows.push(row);
        }

        // Parity rows: out[r] = sum_c encoding[r][c] * rows[c].
        for r in self.k..n {
            let mut parity = vec![0u8; shard_size];
            for c in 0..self.k {
                let coeff = self.encoding.get(r, c);
                if coeff == Gf256::ZERO {
                    continue;
                }
                for (out, &byte) in parity.iter_mut().zip(&rows[c]) {
                    *out ^= coeff.mul(Gf256(byte)).0;
                }
            }
            rows.push(parity);
        }

        debug!(
            k = self.k,
            m = self.m,
            input_len = data.len(),
            shard_size,
            "encoded input into shards"
        );

        rows.into_iter().map(Bytes::from).collect()
    }

    /// Reconstruct the original bytes from a vector of `n` slots.
    ///
    /// Each slot is either a present shard of length `ceil(original_len / k)`
    /// or `None` for a missing/rejected shard. When `k` or more slots are
    /// present the first `original_len` bytes of the data shards are
    /// returned; reconstruction uses the lowest-indexed `k` present rows so
    /// repeated calls are deterministic.
    pub fn decode(
        &self,
        slots: &[Option<Bytes>],
        original_len: usize,
    ) -> Result<Vec<u8>, CodecError> {
        let n = self.total_shards();
        if slots.len() != n {
            return Err(CodecError::InvalidParameters {
                reason: format!("expected {n} shard slots, got {}", slots.len()),
            });
        }

        let shard_size = self.shard_size(original_len);
        let present: Vec<usize> = (0..n).filter(|&i| slots[i].is_some()).collect();

        // Present slots must agree on length, and that length must match
        // what `original_len` declares.
        if let Some(&first) = present.first() {
            let expected = slots[first].as_ref().map(Bytes::len).unwrap_or(0);
            for &i in &present {
                let got = slots[i].as_ref().map(Bytes::len).unwrap_or(0);
                if got != expected {
                    return Err(CodecError::InconsistentShardLength {
                        index: i,
                        got,
                        expected,
                    });
                }
            }
            if expected != shard_size {
                return Err(CodecError::InvalidParameters {
                    reason: format!(
                        "shard length {expected} does not match declared size (need {shard_size})"
                    ),
                });
            }
        }

        if present.len() < self.k {
            return Err(CodecError::InsufficientShards {
                needed: self.k,
                got: present.len(),
            });
        }

        // Fast path: all k data shards present — decoding is the identity.
        if (0..self.k).all(|i| slots[i].is_some()) {
            let mut out = Vec::with_capacity(self.k * shard_size);
            for slot in slots.iter().take(self.k) {
                if let Some(shard) = slot {
                    out.extend_from_slice(shard);
                }
            }
            out.truncate(original_len);
            return Ok(out);
        }

        // Select the lowest-indexed k present rows, invert the matching
        // submatrix of the encoding matrix, and recover the data rows.
        let chosen = &present[..self.k];
        let decode_matrix = self.encoding.select_rows(chosen).invert()?;

        debug!(
            k = self.k,
            m = self.m,
            present = present.len(),
            rows = ?chosen,
            "reconstructing data shards"
        );

        let mut out = vec![0u8; self.k * shard_size];
        for c in 0..self.k {
            let row_out = &mut out[c * shard_size..(c + 1) * shard_size];
            for (j, &src) in chosen.iter().enumerate() {
                let coeff = decode_matrix.get(c, j);
                if coeff == Gf256::ZERO {
                    continue;
                }
                let Some(shard) = slots[src].as_ref() else {
                    continue;
                };
                for (o, &byte) in row_out.iter_mut().zip(shard.iter()) {
                    *o ^= coeff.mul(Gf256(byte)).0;
                }
            }
        }

        out.truncate(original_len);
        Ok(out)
    }
}

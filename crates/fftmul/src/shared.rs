//! Thread-safe multiplication context.
//!
//! Tables sit behind a [`parking_lot::RwLock`]: a multiplication whose
//! transform the tables already cover only takes the read lock. Growth takes
//! the write lock, fits the tables and downgrades, so the multiplication
//! that triggered it never waits on a second acquisition. Scratch buffers
//! come from a [`ScratchPool`] instead of living in the context.

use fftmul_memory::{PoolStats, ScratchPool};
use parking_lot::{RwLock, RwLockWriteGuard};

use crate::context::{build_crts, Job, PrimeTables};
use crate::crt::CrtData;
use crate::error::FftError;
use crate::options::MulOptions;
use crate::profile::{MulShape, ProfileEntry, ProfileTable};

/// A multiplication context usable from many threads at once.
pub struct SharedMulContext {
    tables: RwLock<PrimeTables>,
    crts: Vec<CrtData>,
    profiles: ProfileTable,
    pool: ScratchPool,
    options: MulOptions,
}

impl SharedMulContext {
    /// Shared context over the default prime sequence.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(MulOptions::default())
            .unwrap_or_else(|err| unreachable!("default options are valid: {err}"))
    }

    /// Shared context configured by `options`.
    pub fn with_options(options: MulOptions) -> Result<Self, FftError> {
        let options = options.normalize();
        let tables = PrimeTables::new(options.first_prime)?;
        let primes = tables.primes();
        Ok(Self {
            crts: build_crts(&primes),
            profiles: tables.profiles()?,
            tables: RwLock::new(tables),
            pool: ScratchPool::new(options.max_pooled_len, options.max_per_class),
            options,
        })
    }

    /// The options in effect.
    #[must_use]
    pub fn options(&self) -> &MulOptions {
        &self.options
    }

    /// Profile and shape used for operands of `an` and `bn` limbs.
    pub fn select_profile(
        &self,
        an: usize,
        bn: usize,
    ) -> Result<(ProfileEntry, MulShape), FftError> {
        self.profiles.select(an, bn)
    }

    /// `z = a * b`; `z` must hold `a.len() + b.len()` limbs.
    pub fn mul(&self, z: &mut [u64], a: &[u64], b: &[u64]) -> Result<(), FftError> {
        let job = Job::plan(&self.profiles, z.len(), a, Some(b))?;
        self.execute(job, z)
    }

    /// `z = a^2`; `z` must hold `2 * a.len()` limbs.
    pub fn sqr(&self, z: &mut [u64], a: &[u64]) -> Result<(), FftError> {
        let job = Job::plan(&self.profiles, z.len(), a, None)?;
        self.execute(job, z)
    }

    /// `a * b` as a new limb vector.
    pub fn mul_vec(&self, a: &[u64], b: &[u64]) -> Result<Vec<u64>, FftError> {
        let mut z = vec![0; a.len() + b.len()];
        self.mul(&mut z, a, b)?;
        Ok(z)
    }

    /// `a^2` as a new limb vector.
    pub fn sqr_vec(&self, a: &[u64]) -> Result<Vec<u64>, FftError> {
        let mut z = vec![0; 2 * a.len()];
        self.sqr(&mut z, a)?;
        Ok(z)
    }

    /// Fit the tables for operands of `an` and `bn` limbs and pool
    /// `workers` scratch buffers for them.
    pub fn reserve(&self, an: usize, bn: usize, workers: usize) -> Result<(), FftError> {
        if an == 0 || bn == 0 {
            return Ok(());
        }
        let (entry, shape) = self.profiles.select(an, bn)?;
        let empty: &[u64] = &[];
        let job = Job {
            entry,
            shape,
            a: empty,
            b: Some(empty),
        };
        self.tables.write().fit(&job)?;
        self.pool.warm(job.scratch_len(), workers);
        Ok(())
    }

    /// Bytes held by pooled scratch buffers.
    #[must_use]
    pub fn pooled_bytes(&self) -> usize {
        self.pool.pooled_bytes()
    }

    /// Statistics of the scratch pool.
    #[must_use]
    pub fn scratch_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Depth currently covered by the tables.
    #[must_use]
    pub fn table_depth(&self) -> u32 {
        self.tables.read().depth()
    }

    /// Release tables and pooled scratch.
    pub fn clear(&self) {
        self.tables.write().clear();
        self.pool.clear();
    }

    fn execute(&self, job: Option<Job<'_>>, z: &mut [u64]) -> Result<(), FftError> {
        let Some(job) = job else {
            z.fill(0);
            return Ok(());
        };

        let tables = self.tables.read();
        let tables = if tables.covers(&job) {
            tables
        } else {
            drop(tables);
            let mut grown = self.tables.write();
            grown.fit(&job)?;
            RwLockWriteGuard::downgrade(grown)
        };

        let mut scratch = self.pool.acquire(job.scratch_len());
        let result = tables.run(
            &self.crts,
            &job,
            self.options.parallel_threshold,
            &mut scratch,
            z,
        );
        drop(tables);
        self.pool.release(scratch);
        result
    }
}

impl Default for SharedMulContext {
    fn default() -> Self {
        Self::new()
    }
}

//! Multi-prime multiplication context.
//!
//! A [`MulContext`] owns eight FFT primes with their tables, the CRT data
//! for every prime count a profile can use, the profile table, and a
//! scratch buffer that grows to the largest multiplication seen.
//!
//! A multiplication selects a profile, fits the tables of the profile's
//! primes, runs split / forward / pointwise / inverse for each prime in
//! parallel, and recombines the residues into the product limbs.

use rayon::prelude::*;

use crate::constants::{BLK_SZ, DEFAULT_PRIME, LG_BLK_SZ, MAX_PRIMES};
use crate::convert::{pieces_for, split_operand, PowersOfTwo};
use crate::crt::CrtData;
use crate::error::FftError;
use crate::fft_ctx::{FftContext, Reduction};
use crate::memory_est;
use crate::nmod;
use crate::options::MulOptions;
use crate::profile::{MulShape, ProfileEntry, ProfileKind, ProfileTable};

/// Per-prime tables that grow with the transforms requested.
#[derive(Debug, Clone)]
pub(crate) struct PrimeTables {
    ffts: Vec<FftContext>,
    two_powers: Vec<PowersOfTwo>,
}

impl PrimeTables {
    /// The first prime at or after `first` along the FFT-prime sequence,
    /// and its prime successors.
    pub(crate) fn new(first: u64) -> Result<Self, FftError> {
        let mut p = first_prime_from(first)?;
        let mut ffts = Vec::with_capacity(MAX_PRIMES);
        loop {
            ffts.push(FftContext::new(p)?);
            if ffts.len() == MAX_PRIMES {
                break;
            }
            p = nmod::next_fft_number(p)?;
            while !nmod::is_prime(p) {
                p = nmod::next_fft_number(p)?;
            }
        }
        let two_powers = ffts.iter().map(|f| PowersOfTwo::new(f.prime())).collect();
        Ok(Self { ffts, two_powers })
    }

    pub(crate) fn primes(&self) -> Vec<u64> {
        self.ffts.iter().map(FftContext::prime).collect()
    }

    pub(crate) fn max_depths(&self) -> Vec<u32> {
        self.ffts.iter().map(FftContext::max_depth).collect()
    }

    /// Profile table over these primes. Rejected unless some profile can
    /// multiply beyond a single block.
    pub(crate) fn profiles(&self) -> Result<ProfileTable, FftError> {
        let profiles = ProfileTable::new(&self.primes(), &self.max_depths());
        let usable = profiles
            .entries()
            .iter()
            .any(|e| e.bn_bound >= 1 && e.max_depth > LG_BLK_SZ);
        if usable {
            Ok(profiles)
        } else {
            Err(FftError::NoUsableProfile {
                prime: self.ffts.first().map_or(0, FftContext::prime),
            })
        }
    }

    /// Depth covered by the first prime, which every profile uses.
    pub(crate) fn depth(&self) -> u32 {
        self.ffts.first().map_or(0, FftContext::depth)
    }

    pub(crate) fn covers(&self, job: &Job<'_>) -> bool {
        let (np, depth, pieces) = job.requirements();
        self.ffts[..np].iter().all(|f| f.depth() >= depth)
            && self.two_powers[..np].iter().all(|t| t.len() >= pieces)
    }

    pub(crate) fn fit(&mut self, job: &Job<'_>) -> Result<(), FftError> {
        let (np, depth, pieces) = job.requirements();
        for (ctx, powers) in self.ffts[..np].iter_mut().zip(&mut self.two_powers[..np]) {
            ctx.fit_depth(depth)?;
            powers.fit(pieces);
        }
        Ok(())
    }

    pub(crate) fn clear(&mut self) {
        for ctx in &mut self.ffts {
            ctx.clear();
        }
        for powers in &mut self.two_powers {
            powers.clear();
        }
    }

    /// Run `job` into `z`, using `scratch` for the transforms.
    ///
    /// The tables must cover the job and `scratch` must hold
    /// [`Job::scratch_len`] doubles; its contents on entry are irrelevant.
    pub(crate) fn run(
        &self,
        crts: &[CrtData],
        job: &Job<'_>,
        parallel_threshold: usize,
        scratch: &mut [f64],
        z: &mut [u64],
    ) -> Result<(), FftError> {
        let shape = job.shape;
        let np = job.entry.kind.nprimes();
        let layout = shape.layout();
        let stride = layout.data_size();
        let per_prime = stride * job.buffers_per_prime();
        let scratch = &mut scratch[..np * per_prime];

        scratch
            .par_chunks_mut(per_prime)
            .enumerate()
            .try_for_each(|(i, chunk)| {
                let ctx = &self.ffts[i];
                let plan = ctx
                    .plan(shape.depth)
                    .ok_or(FftError::DepthTooLarge {
                        requested: shape.depth,
                        max: ctx.depth(),
                    })?
                    .with_parallel_threshold(parallel_threshold);
                let powers = &self.two_powers[i];
                let (fa, fb) = chunk.split_at_mut(stride);

                split_operand(&plan, powers, job.a, shape.bits, shape.alen, shape.itrunc_a, fa);
                plan.fft_trunc(fa, shape.itrunc_a, shape.trunc);
                match job.b {
                    Some(b) => {
                        split_operand(&plan, powers, b, shape.bits, shape.blen, shape.itrunc_b, fb);
                        plan.fft_trunc(fb, shape.itrunc_b, shape.trunc);
                        plan.pointwise_mul(fa, fb, shape.trunc);
                    }
                    None => plan.pointwise_sqr(fa, shape.trunc),
                }
                plan.ifft_trunc(fa, shape.trunc, Reduction::Canonical);
                tracing::trace!(
                    prime = ctx.prime(),
                    depth = shape.depth,
                    trunc = shape.trunc,
                    "prime pipeline done"
                );
                Ok::<(), FftError>(())
            })?;

        let residues: Vec<&[f64]> = scratch.chunks(per_prime).map(|c| &c[..stride]).collect();
        job.entry
            .kind
            .reconstruct(&crts[np - 3], layout, &residues, shape.bits, shape.zlen, z);
        Ok(())
    }
}

/// `hint` itself if prime, else the first prime found walking down from
/// the nearest `c * 2^8 + 1` below it.
fn first_prime_from(hint: u64) -> Result<u64, FftError> {
    if nmod::is_prime(hint) {
        return Ok(hint);
    }
    let mut p = (hint.saturating_sub(1) & !(BLK_SZ as u64 - 1)) + 1;
    while !nmod::is_prime(p) {
        p = nmod::next_fft_number(p)?;
    }
    Ok(p)
}

/// CRT data for every profile kind, indexed by `nprimes - 3`.
pub(crate) fn build_crts(primes: &[u64]) -> Vec<CrtData> {
    ProfileKind::ALL
        .iter()
        .map(|k| CrtData::new(&primes[..k.nprimes()]))
        .collect()
}

/// One multiplication, with the larger operand first.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Job<'a> {
    pub(crate) entry: ProfileEntry,
    pub(crate) shape: MulShape,
    pub(crate) a: &'a [u64],
    /// `None` for a square.
    pub(crate) b: Option<&'a [u64]>,
}

impl<'a> Job<'a> {
    /// Validate the output length and pick a profile. `Ok(None)` means the
    /// product is zero.
    pub(crate) fn plan(
        profiles: &ProfileTable,
        zlen: usize,
        a: &'a [u64],
        b: Option<&'a [u64]>,
    ) -> Result<Option<Self>, FftError> {
        let blen = b.map_or(a.len(), <[u64]>::len);
        let expected = a.len() + blen;
        if zlen != expected {
            return Err(FftError::OutputLength {
                expected,
                actual: zlen,
            });
        }
        let (a, b) = match b {
            Some(b) if std::ptr::eq(a, b) => (a, None),
            Some(b) if b.len() > a.len() => (b, Some(a)),
            other => (a, other),
        };
        let bn = b.map_or(a.len(), <[u64]>::len);
        if bn == 0 {
            return Ok(None);
        }
        let (entry, shape) = profiles.select(a.len(), bn)?;
        tracing::debug!(
            an = a.len(),
            bn,
            nprimes = entry.kind.nprimes(),
            bits = entry.bits,
            depth = shape.depth,
            "profile selected"
        );
        Ok(Some(Self { entry, shape, a, b }))
    }

    fn buffers_per_prime(&self) -> usize {
        if self.b.is_some() {
            2
        } else {
            1
        }
    }

    /// `(primes, depth, conversion pieces)` the tables must cover.
    pub(crate) fn requirements(&self) -> (usize, u32, usize) {
        (
            self.entry.kind.nprimes(),
            self.shape.depth,
            pieces_for(self.entry.bits),
        )
    }

    /// Doubles of scratch the job needs.
    pub(crate) fn scratch_len(&self) -> usize {
        self.entry.kind.nprimes() * self.buffers_per_prime() * self.shape.layout().data_size()
    }
}

/// Single-threaded-owner multiplication context.
///
/// Tables and scratch grow to the largest multiplication seen and are kept
/// until [`clear`](Self::clear) or drop.
#[derive(Debug, Clone)]
pub struct MulContext {
    tables: PrimeTables,
    crts: Vec<CrtData>,
    profiles: ProfileTable,
    scratch: Vec<f64>,
    options: MulOptions,
}

impl MulContext {
    /// Context over the default prime sequence.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(MulOptions::default())
            .unwrap_or_else(|err| unreachable!("default prime {DEFAULT_PRIME:#x} is valid: {err}"))
    }

    /// Context whose primes start at the first prime at or after `prime`
    /// along the FFT-prime sequence.
    pub fn with_prime(prime: u64) -> Result<Self, FftError> {
        Self::with_options(MulOptions {
            first_prime: prime,
            ..MulOptions::default()
        })
    }

    /// Context configured by `options`; zero fields take their defaults.
    pub fn with_options(options: MulOptions) -> Result<Self, FftError> {
        let options = options.normalize();
        let tables = PrimeTables::new(options.first_prime)?;
        let primes = tables.primes();
        let crts = build_crts(&primes);
        let profiles = tables.profiles()?;
        tracing::debug!(
            first_prime = primes[0],
            profiles = profiles.entries().len(),
            "multiplication context ready"
        );
        Ok(Self {
            tables,
            crts,
            profiles,
            scratch: Vec::new(),
            options,
        })
    }

    /// The options in effect.
    #[must_use]
    pub fn options(&self) -> &MulOptions {
        &self.options
    }

    /// The context's primes, in order.
    #[must_use]
    pub fn primes(&self) -> Vec<u64> {
        self.tables.primes()
    }

    /// The profile table, in selection order.
    #[must_use]
    pub fn profiles(&self) -> &[ProfileEntry] {
        self.profiles.entries()
    }

    /// Profile and shape used for operands of `an` and `bn` limbs.
    pub fn select_profile(
        &self,
        an: usize,
        bn: usize,
    ) -> Result<(ProfileEntry, MulShape), FftError> {
        self.profiles.select(an, bn)
    }

    /// Predicted bytes for multiplying operands of `an` and `bn` limbs.
    pub fn estimate_memory(&self, an: usize, bn: usize) -> Result<usize, FftError> {
        if an == 0 || bn == 0 {
            return Ok(0);
        }
        let (entry, shape) = self.profiles.select(an, bn)?;
        Ok(memory_est::estimate_mul_memory(&shape, entry.kind.nprimes(), false))
    }

    /// Depth currently covered by the tables (0 after [`clear`](Self::clear)).
    #[must_use]
    pub fn table_depth(&self) -> u32 {
        self.tables.depth()
    }

    /// Doubles currently held as scratch.
    #[must_use]
    pub fn scratch_len(&self) -> usize {
        self.scratch.len()
    }

    /// Fit tables and scratch for operands of `an` and `bn` limbs so that
    /// later multiplications up to that size allocate nothing.
    pub fn reserve(&mut self, an: usize, bn: usize) -> Result<(), FftError> {
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
        self.tables.fit(&job)?;
        self.grow_scratch(job.scratch_len());
        Ok(())
    }

    /// `z = a * b`; `z` must hold `a.len() + b.len()` limbs.
    pub fn mul(&mut self, z: &mut [u64], a: &[u64], b: &[u64]) -> Result<(), FftError> {
        let job = Job::plan(&self.profiles, z.len(), a, Some(b))?;
        self.execute(job, z)
    }

    /// `z = a^2`; `z` must hold `2 * a.len()` limbs.
    pub fn sqr(&mut self, z: &mut [u64], a: &[u64]) -> Result<(), FftError> {
        let job = Job::plan(&self.profiles, z.len(), a, None)?;
        self.execute(job, z)
    }

    /// `a * b` as a new limb vector of `a.len() + b.len()` limbs.
    pub fn mul_vec(&mut self, a: &[u64], b: &[u64]) -> Result<Vec<u64>, FftError> {
        let mut z = vec![0; a.len() + b.len()];
        self.mul(&mut z, a, b)?;
        Ok(z)
    }

    /// `a^2` as a new limb vector of `2 * a.len()` limbs.
    pub fn sqr_vec(&mut self, a: &[u64]) -> Result<Vec<u64>, FftError> {
        let mut z = vec![0; 2 * a.len()];
        self.sqr(&mut z, a)?;
        Ok(z)
    }

    /// Release tables and scratch. The context stays usable.
    pub fn clear(&mut self) {
        self.tables.clear();
        self.scratch = Vec::new();
    }

    fn execute(&mut self, job: Option<Job<'_>>, z: &mut [u64]) -> Result<(), FftError> {
        let Some(job) = job else {
            z.fill(0);
            return Ok(());
        };
        if !self.tables.covers(&job) {
            self.tables.fit(&job)?;
        }
        self.grow_scratch(job.scratch_len());
        self.tables.run(
            &self.crts,
            &job,
            self.options.parallel_threshold,
            &mut self.scratch,
            z,
        )
    }

    fn grow_scratch(&mut self, len: usize) {
        if self.scratch.len() < len {
            tracing::debug!(from = self.scratch.len(), to = len, "growing scratch");
            self.scratch.resize(len, 0.0);
        }
    }
}

impl Default for MulContext {
    fn default() -> Self {
        Self::new()
    }
}

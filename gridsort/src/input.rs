/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Input generation.

use rand::Rng;
use rand::SeedableRng;
use rand::distributions::Alphanumeric;
use rand::rngs::SmallRng;

/// `len` random ASCII letters and digits. The same `seed` always yields
/// the same input; without one the generator is seeded from entropy.
pub fn random_input(len: usize, seed: Option<u64>) -> Vec<char> {
    let rng = match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    };
    rng.sample_iter(Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

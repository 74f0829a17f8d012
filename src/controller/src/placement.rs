// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Placement policy: choosing R targets for a new file, and choosing one
//! replica to serve a read.

use std::collections::BTreeSet;

use rand::seq::IteratorRandom;

use crate::membership::Membership;

/// The first `r` ports in ascending order, or `None` if fewer than `r`
/// Stores are connected: "first R in iteration order of the membership
/// table," with a `BTreeMap` making that order well-defined.
pub fn select_targets(membership: &Membership, r: usize) -> Option<BTreeSet<u16>> {
    let ports = membership.ports();
    if ports.len() < r {
        return None;
    }
    Some(ports.into_iter().take(r).collect())
}

/// One port drawn uniformly at random from `candidates`, used for both
/// `LOAD` and `RELOAD`. No per-client last-served tracking: a previously
/// served port is not excluded from future picks.
pub fn choose_replica(candidates: &BTreeSet<u16>) -> Option<u16> {
    candidates.iter().copied().choose(&mut rand::thread_rng())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn membership_with_ports(ports: &[u16]) -> Membership {
        let mut m = Membership::new();
        for &p in ports {
            let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
            m.join(p, crate::membership::StoreHandle::new(tx));
        }
        m
    }

    #[test]
    fn selects_first_r_ascending() {
        let m = membership_with_ports(&[8003, 8001, 8002]);
        assert_eq!(
            select_targets(&m, 2).unwrap(),
            BTreeSet::from([8001, 8002])
        );
    }

    #[test]
    fn none_when_not_enough_stores() {
        let m = membership_with_ports(&[8001]);
        assert!(select_targets(&m, 2).is_none());
    }

    #[test]
    fn choose_replica_picks_from_candidates() {
        let candidates = BTreeSet::from([8001, 8002]);
        let chosen = choose_replica(&candidates).unwrap();
        assert!(candidates.contains(&chosen));
    }

    #[test]
    fn choose_replica_on_empty_set_is_none() {
        assert!(choose_replica(&BTreeSet::new()).is_none());
    }
}

//! Merge property tests
//!
//! Merging shard results must not depend on how the occurrences were split
//! into shards, the order the shards arrive in, or whether a shard is
//! delivered twice.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crispr_hits::catalog::genes::{GeneCatalog, GeneRef};
use crispr_hits::core::genome::GenomeRef;
use crispr_hits::parsing::blast::{AlignmentRecord, AlignmentReport};
use crispr_hits::resolve::aggregate::ResultAggregator;
use crispr_hits::resolve::filter::AlignmentFilter;
use crispr_hits::resolve::merger::SharedHit;
use crispr_hits::{GenomeCatalog, Hit, Occurrence, Strand, TaxonCriteria};

fn catalog() -> GenomeCatalog {
    let mut catalog = GenomeCatalog::new();
    for (id, size) in [("G1", 1000), ("G2", 5_000_000), ("G3", 20_000)] {
        catalog
            .add_genome(GenomeRef::new(id, format!("Taxon {id}"), format!("Organism {id}"), size))
            .unwrap();
    }
    catalog
}

fn shards() -> Vec<Vec<Occurrence>> {
    vec![
        vec![
            Occurrence::new("G1", 42, Strand::Forward),
            Occurrence::new("G1", 42, Strand::Forward),
            Occurrence::new("G3", 7, Strand::Reverse),
        ],
        vec![
            Occurrence::new("G2", 4_999_999, Strand::Reverse),
            Occurrence::new("G1", 42, Strand::Reverse),
        ],
        vec![
            Occurrence::new("G3", 7, Strand::Reverse),
            Occurrence::new("G3", 19_999, Strand::Forward),
            Occurrence::new("G1", 900, Strand::Forward),
        ],
    ]
}

/// All orderings of `0..n`
fn permutations(n: usize) -> Vec<Vec<usize>> {
    if n == 0 {
        return vec![Vec::new()];
    }
    let mut result = Vec::new();
    for rest in permutations(n - 1) {
        for pos in 0..=rest.len() {
            let mut order = rest.clone();
            order.insert(pos, n - 1);
            result.push(order);
        }
    }
    result
}

fn merge_in_order(order: &[usize], catalog: &GenomeCatalog) -> Hit {
    let shards = shards();
    let mut hit = Hit::new("ACGT");
    for &i in order {
        hit.merge(shards[i].clone(), catalog);
    }
    hit
}

fn as_set(hit: &Hit) -> BTreeSet<Occurrence> {
    hit.list_occ().cloned().collect()
}

#[test]
fn test_merge_commutes_across_shard_orders() {
    let catalog = catalog();
    let orders = permutations(shards().len());
    assert_eq!(orders.len(), 6);

    let expected = as_set(&merge_in_order(&orders[0], &catalog));
    assert_eq!(expected.len(), 6);

    for order in &orders {
        let hit = merge_in_order(order, &catalog);
        assert_eq!(as_set(&hit), expected, "order {order:?}");
        assert_eq!(hit.number_occurrences(), expected.len());
    }
}

#[test]
fn test_merge_is_idempotent() {
    let catalog = catalog();
    let mut hit = merge_in_order(&[0, 1, 2], &catalog);
    let before = as_set(&hit);

    for shard in shards() {
        let stats = hit.merge(shard.clone(), &catalog);
        assert_eq!(stats.added, 0);
        assert_eq!(stats.duplicates, shard.len());
    }

    assert_eq!(as_set(&hit), before);
    assert_eq!(hit.number_occurrences(), before.len());
}

#[test]
fn test_merge_hit_matches_flat_merge() {
    let catalog = catalog();
    let shards = shards();

    let mut left = Hit::new("ACGT");
    left.merge(shards[0].clone(), &catalog);
    let mut right = Hit::new("ACGT");
    right.merge(shards[1].clone(), &catalog);
    right.merge(shards[2].clone(), &catalog);
    left.merge_hit(right, &catalog);

    assert_eq!(as_set(&left), as_set(&merge_in_order(&[0, 1, 2], &catalog)));
}

#[test]
fn test_shared_hit_matches_sequential_merge() {
    let catalog = Arc::new(catalog());
    let shared = Arc::new(SharedHit::new("ACGT"));

    let handles: Vec<_> = shards()
        .into_iter()
        .map(|shard| {
            let shared = Arc::clone(&shared);
            let catalog = Arc::clone(&catalog);
            std::thread::spawn(move || {
                shared.merge(shard, &catalog);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let hit = shared.snapshot();
    assert_eq!(as_set(&hit), as_set(&merge_in_order(&[2, 0, 1], &catalog)));
    assert_eq!(shared.number_occurrences(), hit.number_occurrences());
}

#[test]
fn test_aggregation_order_is_deterministic() {
    let catalog = catalog();
    let report: AlignmentReport = [
        AlignmentRecord::new("G1", "geneA", 99.0, 20),
        AlignmentRecord::new("G3", "geneC", 97.0, 20),
        AlignmentRecord::new("G2", "geneB", 96.0, 20),
    ]
    .into_iter()
    .collect();

    let mut genes = GeneCatalog::new();
    for record in report.records() {
        genes.insert(GeneRef::new(
            record.gene_id.as_str(),
            record.subject_genome_id.as_str(),
        ));
    }

    let filter = AlignmentFilter::new(&catalog);
    let qualifying = filter.filter_genes(&report).unwrap();
    let best: BTreeMap<_, _> = filter.best_hits(&report);
    let criteria = TaxonCriteria::default();
    let aggregator = ResultAggregator::new(&catalog, &genes, &criteria);

    let mut rendered = Vec::new();
    for order in permutations(shards().len()) {
        let hit = merge_in_order(&order, &catalog);
        let summaries = aggregator.aggregate(&hit, &qualifying, &best).unwrap();
        rendered.push(serde_json::to_string(&summaries).unwrap());
    }

    assert!(rendered.windows(2).all(|w| w[0] == w[1]));

    let hit = merge_in_order(&[0, 1, 2], &catalog);
    let summaries = aggregator.aggregate(&hit, &qualifying, &best).unwrap();
    let ids: Vec<&str> = summaries.iter().map(|s| s.gene_id.as_str()).collect();
    // G1 holds three occurrences, G3 two, G2 one
    assert_eq!(ids, vec!["geneA", "geneC", "geneB"]);
}

use metablock::block::Block;
use metablock::entity_index::EntityIndex;
use metablock::scan::ScanContext;
use metablock::weighting::WeightingScheme;

// Two bilateral blocks over four entities (dataset limit 2):
//   block 0: {0, 1} x {2}
//   block 1: {0} x {2, 3}
// Entity 0 appears in 2 blocks, entity 1 in 1, entity 2 in 2, entity 3 in 1.
fn fixture() -> (Vec<Block>, EntityIndex) {
    let blocks = vec![
        Block::Bilateral {
            index1: vec![0, 1],
            index2: vec![0],
        },
        Block::Bilateral {
            index1: vec![0],
            index2: vec![0, 1],
        },
    ];
    let index = EntityIndex::build(&blocks, 4, 2).unwrap();
    (blocks, index)
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-12,
        "expected {}, got {}",
        expected,
        actual
    );
}

#[test]
fn test_cbs_counts_shared_blocks() {
    let (blocks, index) = fixture();
    let mut cx = ScanContext::new(&blocks, &index, WeightingScheme::Cbs);
    cx.scan_entity(0);
    assert_eq!(cx.weight(0, 2), 2.0);
    assert_eq!(cx.weight(0, 3), 1.0);
    cx.scan_entity(1);
    assert_eq!(cx.weight(1, 2), 1.0);
}

#[test]
fn test_js_is_jaccard_over_block_sets() {
    let (blocks, index) = fixture();
    let mut cx = ScanContext::new(&blocks, &index, WeightingScheme::Js);
    cx.scan_entity(0);
    // 2 shared / (2 + 2 - 2)
    assert_close(cx.weight(0, 2), 1.0);
    // 1 shared / (2 + 1 - 1)
    assert_close(cx.weight(0, 3), 0.5);
    cx.scan_entity(1);
    // 1 shared / (1 + 2 - 1)
    assert_close(cx.weight(1, 2), 0.5);
}

#[test]
fn test_arcs_weighs_blocks_by_comparison_count() {
    let (blocks, index) = fixture();
    let mut cx = ScanContext::new(&blocks, &index, WeightingScheme::Arcs);
    cx.scan_entity_arcs(0);
    // Each block spans two comparisons, contributing 1/2 per co-occurrence.
    assert_close(cx.weight(0, 2), 1.0);
    assert_close(cx.weight(0, 3), 0.5);
}

#[test]
fn test_ecbs_dampens_by_block_frequency() {
    // Dirty fixture where every entity sits in 2 of 3 blocks, so the IDF
    // factors are log10(3/2) on both ends.
    let blocks = vec![
        Block::Unilateral {
            entities: vec![0, 1],
        },
        Block::Unilateral {
            entities: vec![0, 2],
        },
        Block::Unilateral {
            entities: vec![1, 2],
        },
    ];
    let index = EntityIndex::build(&blocks, 3, 0).unwrap();
    let mut cx = ScanContext::new(&blocks, &index, WeightingScheme::Ecbs);
    cx.scan_entity(0);
    let idf = (3.0_f64 / 2.0).log10();
    assert_close(cx.weight(0, 1), 1.0 * idf * idf);
    assert_close(cx.weight(0, 2), 1.0 * idf * idf);
}

#[test]
fn test_ejs_dampens_js_by_comparison_counts() {
    let (blocks, index) = fixture();
    let mut cx = ScanContext::new(&blocks, &index, WeightingScheme::Ejs);
    // Distinct comparisons: entity 0 meets {2, 3}, entity 1 meets {2},
    // mirrored on the other side; 6 endpoint counts halve to 3.
    cx.scan_entity(0);
    let expected_02 = 1.0 * (3.0_f64 / 2.0).log10() * (3.0_f64 / 2.0).log10();
    assert_close(cx.weight(0, 2), expected_02);
    let expected_03 = 0.5 * (3.0_f64 / 2.0).log10() * (3.0_f64 / 1.0).log10();
    assert_close(cx.weight(0, 3), expected_03);
    cx.scan_entity(1);
    let expected_12 = 0.5 * (3.0_f64 / 1.0).log10() * (3.0_f64 / 2.0).log10();
    assert_close(cx.weight(1, 2), expected_12);
}

#[test]
fn test_wjs_divides_by_idf_totals() {
    let (blocks, index) = fixture();
    let mut cx = ScanContext::new(&blocks, &index, WeightingScheme::Wjs);
    cx.scan_entity(0);
    // totalWeight(0) = log10(2/2) + log10(2/1), same for entity 2.
    let expected = 2.0 / (f64::MIN_POSITIVE + 2.0 * 2.0_f64.log10());
    assert_close(cx.weight(0, 2), expected);
}

#[test]
fn test_wjs_epsilon_guards_zero_totals() {
    // Both entities sit in one block covering their whole dataset side, so
    // both IDF totals are log10(1) = 0 and only the epsilon remains.
    let blocks = vec![Block::Bilateral {
        index1: vec![0],
        index2: vec![0],
    }];
    let index = EntityIndex::build(&blocks, 2, 1).unwrap();
    let mut cx = ScanContext::new(&blocks, &index, WeightingScheme::Wjs);
    cx.scan_entity(0);
    let weight = cx.weight(0, 1);
    assert!(weight.is_finite());
    assert!(weight > 0.0);
}

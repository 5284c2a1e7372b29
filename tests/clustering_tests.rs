use motif_cluster_rs::{
    cluster, cluster_labels, cluster_matrix, ClusterConfig, Dendrogram, DistanceMatrix,
    DistanceOptions, Linkage, MotifCollection, MotifError, Partition, Ppm,
};
use std::collections::HashSet;

const LINKAGES: [Linkage; 4] = [
    Linkage::Single,
    Linkage::Complete,
    Linkage::Upgma,
    Linkage::Wpgma,
];

fn ids(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn scenario_matrix() -> (Vec<Vec<f64>>, Vec<String>) {
    let rows = vec![
        vec![0.0, 1.0, 4.0, 6.0],
        vec![1.0, 0.0, 5.0, 7.0],
        vec![4.0, 5.0, 0.0, 3.0],
        vec![6.0, 7.0, 3.0, 0.0],
    ];
    (rows, ids(&["A", "B", "C", "D"]))
}

fn six_motif_matrix() -> DistanceMatrix {
    let rows = vec![
        vec![0.0, 0.3, 2.1, 2.4, 5.0, 4.8],
        vec![0.3, 0.0, 1.9, 2.2, 5.1, 4.9],
        vec![2.1, 1.9, 0.0, 0.7, 3.9, 4.1],
        vec![2.4, 2.2, 0.7, 0.0, 3.6, 3.8],
        vec![5.0, 5.1, 3.9, 3.6, 0.0, 1.2],
        vec![4.8, 4.9, 4.1, 3.8, 1.2, 0.0],
    ];
    DistanceMatrix::from_rows(ids(&["m1", "m2", "m3", "m4", "m5", "m6"]), &rows).unwrap()
}

fn as_sets(partition: &Partition) -> Vec<HashSet<String>> {
    partition
        .iter()
        .map(|c| c.iter().cloned().collect())
        .collect()
}

fn assert_complete_partition(partition: &Partition, ids: &[String], k: usize) {
    assert_eq!(partition.len(), k);
    assert!(partition.iter().all(|c| !c.is_empty()));

    let flat: Vec<&String> = partition.iter().flatten().collect();
    let unique: HashSet<&String> = flat.iter().copied().collect();
    assert_eq!(flat.len(), unique.len(), "an identifier appears twice");
    assert_eq!(unique, ids.iter().collect::<HashSet<_>>());
}

#[test]
fn test_single_linkage_merges_closest_pair() {
    let (rows, names) = scenario_matrix();
    let partition = cluster(&rows, &names, 3, Linkage::Single).unwrap();

    let sets = as_sets(&partition);
    assert_eq!(sets.len(), 3);
    assert!(sets.contains(&["A", "B"].iter().map(|s| s.to_string()).collect()));
    assert!(sets.contains(&["C".to_string()].into_iter().collect()));
    assert!(sets.contains(&["D".to_string()].into_iter().collect()));
}

#[test]
fn test_partition_is_complete_for_every_k() {
    let matrix = six_motif_matrix();
    for linkage in LINKAGES {
        let tree = Dendrogram::build(&matrix, linkage).unwrap();
        for k in 1..=matrix.len() {
            let partition = tree.cut(k).unwrap();
            assert_complete_partition(&partition, matrix.ids(), k);
        }
    }
}

#[test]
fn test_boundary_cuts() {
    let matrix = six_motif_matrix();
    let tree = Dendrogram::build(&matrix, Linkage::Upgma).unwrap();

    let singletons = tree.cut(matrix.len()).unwrap();
    assert!(singletons.iter().all(|c| c.len() == 1));

    // building once and cutting at k = 1 recovers every identifier exactly once
    let whole = tree.cut(1).unwrap();
    assert_eq!(whole.len(), 1);
    let mut members = whole[0].clone();
    members.sort();
    assert_eq!(members, matrix.ids().to_vec());
    assert_eq!(tree.root().leaves().len(), matrix.len());
}

#[test]
fn test_natural_groups_are_recovered() {
    let matrix = six_motif_matrix();
    for linkage in LINKAGES {
        let partition = cluster_matrix(&matrix, 3, linkage).unwrap();
        let labels = cluster_labels(&partition);
        assert_eq!(labels["m1"], labels["m2"], "{}", linkage);
        assert_eq!(labels["m3"], labels["m4"], "{}", linkage);
        assert_eq!(labels["m5"], labels["m6"], "{}", linkage);
        assert_ne!(labels["m1"], labels["m3"], "{}", linkage);
        assert_ne!(labels["m3"], labels["m5"], "{}", linkage);
    }
}

#[test]
fn test_heights_are_monotonic() {
    let matrix = six_motif_matrix();
    for linkage in [Linkage::Single, Linkage::Complete, Linkage::Upgma] {
        let tree = Dendrogram::build(&matrix, linkage).unwrap();
        let internal = tree.root().internal_nodes();
        assert_eq!(internal.len(), matrix.len() - 1);
        for node in internal {
            let (left, right) = node.children().unwrap();
            assert!(node.height() >= left.height());
            assert!(node.height() >= right.height());
            assert_eq!(node.size(), left.size() + right.size());
        }
    }
}

#[test]
fn test_linkage_rules_set_root_height() {
    // a-b merge first at height 1, c joins at half the updated distance
    let rows = vec![
        vec![0.0, 2.0, 6.0],
        vec![2.0, 0.0, 4.0],
        vec![6.0, 4.0, 0.0],
    ];
    let matrix = DistanceMatrix::from_rows(ids(&["a", "b", "c"]), &rows).unwrap();
    let expected = [
        (Linkage::Single, 2.0),
        (Linkage::Complete, 3.0),
        (Linkage::Upgma, 2.5),
        (Linkage::Wpgma, 2.5),
    ];
    for (linkage, height) in expected {
        let tree = Dendrogram::build(&matrix, linkage).unwrap();
        assert_eq!(tree.root().height(), height, "{}", linkage);
        assert_eq!(tree.root().size(), 3);
        assert_eq!(tree.linkage(), linkage);
    }

    // UPGMA weights by cluster size, WPGMA does not: d joins the 3-member
    // cluster {a, b, c} last
    let rows = vec![
        vec![0.0, 1.0, 2.0, 8.0],
        vec![1.0, 0.0, 2.0, 8.0],
        vec![2.0, 2.0, 0.0, 5.0],
        vec![8.0, 8.0, 5.0, 0.0],
    ];
    let matrix = DistanceMatrix::from_rows(ids(&["a", "b", "c", "d"]), &rows).unwrap();
    let upgma = Dendrogram::build(&matrix, Linkage::Upgma).unwrap();
    let wpgma = Dendrogram::build(&matrix, Linkage::Wpgma).unwrap();
    assert_eq!(upgma.root().height(), (8.0 * 2.0 + 5.0) / 3.0 / 2.0);
    assert_eq!(wpgma.root().height(), (8.0 + 5.0) / 2.0 / 2.0);
}

#[test]
fn test_ties_are_broken_deterministically() {
    let rows = vec![
        vec![0.0, 1.0, 1.0],
        vec![1.0, 0.0, 1.0],
        vec![1.0, 1.0, 0.0],
    ];
    let names = ids(&["a", "b", "c"]);
    let matrix = DistanceMatrix::from_rows(names.clone(), &rows).unwrap();

    let first = Dendrogram::build(&matrix, Linkage::Single).unwrap();
    let second = Dendrogram::build(&matrix, Linkage::Single).unwrap();
    assert_eq!(first, second);

    // a and b are the first tied pair; the surviving leaf c comes before the merge
    assert_eq!(first.root().leaves(), ids(&["c", "a", "b"]));
    assert_eq!(
        cluster(&rows, &names, 2, Linkage::Single).unwrap(),
        cluster(&rows, &names, 2, Linkage::Single).unwrap()
    );
}

#[test]
fn test_input_matrix_is_not_modified() {
    let matrix = six_motif_matrix();
    let before = matrix.clone();
    Dendrogram::build(&matrix, Linkage::Complete).unwrap();
    assert_eq!(matrix, before);
}

#[test]
fn test_single_motif() {
    let partition = cluster(&[vec![0.0]], &ids(&["only"]), 1, Linkage::Single).unwrap();
    assert_eq!(partition, vec![ids(&["only"])]);
}

#[test]
fn test_invalid_arguments() {
    let (rows, names) = scenario_matrix();

    assert!(matches!(
        cluster(&rows, &names, 0, Linkage::Single),
        Err(MotifError::InvalidParameter { .. })
    ));
    assert!(matches!(
        cluster(&rows, &names, 5, Linkage::Single),
        Err(MotifError::InvalidParameter { .. })
    ));
    assert!(matches!(
        "centroid".parse::<Linkage>(),
        Err(MotifError::InvalidParameter { .. })
    ));
    assert_eq!("UPGMA".parse::<Linkage>().unwrap(), Linkage::Upgma);
    assert_eq!("wpgma".parse::<Linkage>().unwrap(), Linkage::Wpgma);

    assert!(matches!(
        cluster(&[], &[], 1, Linkage::Single),
        Err(MotifError::EmptyInput(_))
    ));
}

#[test]
fn test_malformed_matrices_are_rejected() {
    let names = ids(&["a", "b"]);
    let asymmetric = vec![vec![0.0, 1.0], vec![2.0, 0.0]];
    assert!(matches!(
        DistanceMatrix::from_rows(names.clone(), &asymmetric),
        Err(MotifError::Validation(_))
    ));

    let negative = vec![vec![0.0, -1.0], vec![-1.0, 0.0]];
    assert!(DistanceMatrix::from_rows(names.clone(), &negative).is_err());

    let ragged = vec![vec![0.0, 1.0], vec![1.0]];
    assert!(DistanceMatrix::from_rows(names.clone(), &ragged).is_err());

    let square = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
    assert!(DistanceMatrix::from_rows(ids(&["a", "a"]), &square).is_err());
    assert!(DistanceMatrix::from_rows(ids(&["a", "b", "c"]), &square).is_err());
}

#[test]
fn test_distance_matrix_from_motifs() {
    let mut motifs = MotifCollection::new();
    motifs.insert(
        "x".into(),
        Ppm::from_rows(&[[0.85, 0.05, 0.05, 0.05], [0.05, 0.85, 0.05, 0.05]]).unwrap(),
    );
    motifs.insert(
        "y".into(),
        Ppm::from_rows(&[[0.85, 0.05, 0.05, 0.05], [0.05, 0.85, 0.05, 0.05]]).unwrap(),
    );
    motifs.insert(
        "z".into(),
        Ppm::from_rows(&[[0.05, 0.05, 0.05, 0.85]; 3]).unwrap(),
    );

    let matrix = DistanceMatrix::from_motifs(&motifs, &DistanceOptions::default()).unwrap();
    assert_eq!(matrix.ids(), ids(&["x", "y", "z"]).as_slice());
    assert_eq!(matrix.get(0, 1), 0.0);
    assert!(matrix.get(0, 2) > 0.0);
    for i in 0..3 {
        assert_eq!(matrix.get(i, i), 0.0);
        for j in 0..3 {
            assert_eq!(matrix.get(i, j), matrix.get(j, i));
        }
    }

    let config = ClusterConfig {
        k: 2,
        ..ClusterConfig::default()
    };
    let partition = config.run(&motifs).unwrap();
    let labels = cluster_labels(&partition);
    assert_eq!(labels["x"], labels["y"]);
    assert_ne!(labels["x"], labels["z"]);

    assert!(matches!(
        DistanceMatrix::from_motifs(&MotifCollection::new(), &DistanceOptions::default()),
        Err(MotifError::EmptyInput(_))
    ));
}

#[test]
fn test_negative_zero_distances_cut_like_zero() {
    let rows = vec![
        vec![0.0, -0.0, 1.0],
        vec![-0.0, 0.0, 1.0],
        vec![1.0, 1.0, 0.0],
    ];
    let names = ids(&["a", "b", "c"]);

    let matrix = DistanceMatrix::from_rows(names.clone(), &rows).unwrap();
    assert!(matrix.get(0, 1).is_sign_positive());

    for linkage in LINKAGES {
        let singletons = cluster(&rows, &names, 3, linkage).unwrap();
        assert_eq!(singletons.len(), 3, "{}", linkage);
        assert!(singletons.iter().all(|members| members.len() == 1));

        let pair = cluster(&rows, &names, 2, linkage).unwrap();
        let labels = cluster_labels(&pair);
        assert_eq!(labels["a"], labels["b"]);
        assert_ne!(labels["a"], labels["c"]);
    }
}

#[test]
fn test_smoothed_motifs_are_not_pseudocounted_twice() {
    let mut motifs = MotifCollection::new();
    motifs.insert(
        "x".into(),
        Ppm::from_rows(&[[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]]).unwrap(),
    );
    motifs.insert(
        "y".into(),
        Ppm::from_rows(&[[0.9, 0.1, 0.0, 0.0], [0.0, 0.9, 0.1, 0.0]]).unwrap(),
    );
    motifs.insert("z".into(), Ppm::from_rows(&[[0.0, 0.0, 0.0, 1.0]; 3]).unwrap());

    let config = ClusterConfig {
        k: 2,
        ..ClusterConfig::default()
    };
    let smoothed: MotifCollection = motifs
        .iter()
        .map(|(id, ppm)| (id.clone(), ppm.with_pseudocount(config.pseudocount).unwrap()))
        .collect();

    assert_eq!(
        config.run(&motifs).unwrap(),
        config.run_smoothed(&smoothed).unwrap()
    );
}

use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, ArrayView1, Axis, Data, Ix2};

/// Given a score matrix with shape `(n_points, n_clusters)`, return for every
/// point the index of the cluster with the lowest score.
///
/// When `groups` is given, all points sharing a group id are forced onto a
/// single label: the mean score vector of the group is computed and every
/// member receives its argmin cluster. Group ids are small non-negative
/// integers; ids without members are skipped.
///
/// Ties are broken towards the smaller cluster index. The score matrix must
/// have at least one column.
pub fn reassign_labels<F: Float>(
    scores: &ArrayBase<impl Data<Elem = F>, Ix2>,
    groups: Option<&Array1<usize>>,
) -> Array1<usize> {
    let groups = match groups {
        None => return scores.map_axis(Axis(1), argmin),
        Some(groups) => groups,
    };

    let n_groups = groups.iter().max().map(|&id| id + 1).unwrap_or(0);
    let n_clusters = scores.ncols();
    let mut sums = Array2::<F>::zeros((n_groups, n_clusters));
    let mut counts = vec![0usize; n_groups];
    for (index, &id) in groups.iter().enumerate() {
        let mut row = sums.row_mut(id);
        row += &scores.row(index);
        counts[id] += 1;
    }

    let mut group_labels = vec![0usize; n_groups];
    for (id, &count) in counts.iter().enumerate() {
        if count == 0 {
            continue;
        }
        let mean = sums.row(id).mapv(|sum| sum / F::cast(count));
        group_labels[id] = argmin(mean.view());
    }

    groups.mapv(|id| group_labels[id])
}

/// Index of the smallest entry; the first one wins on ties.
pub(crate) fn argmin<F: Float>(row: ArrayView1<F>) -> usize {
    let mut min_index = 0;
    let mut min_score = row[0];
    for (index, &score) in row.iter().enumerate().skip(1) {
        if score < min_score {
            min_index = index;
            min_score = score;
        }
    }
    min_index
}

/// Indices of the points assigned to each cluster under `labels`.
pub(crate) fn cluster_memberships(labels: &Array1<usize>, n_clusters: usize) -> Vec<Vec<usize>> {
    let mut memberships = vec![Vec::new(); n_clusters];
    for (index, &label) in labels.iter().enumerate() {
        memberships[label].push(index);
    }
    memberships
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn picks_row_minimum() {
        let scores = array![[3.0, 1.0, 2.0], [0.5, 0.6, 0.7], [9.0, 8.0, 7.0]];
        assert_eq!(reassign_labels(&scores, None), array![1, 0, 2]);
    }

    #[test]
    fn ties_go_to_the_first_cluster() {
        let scores = array![[1.0, 1.0], [2.0, 2.0]];
        assert_eq!(reassign_labels(&scores, None), array![0, 0]);
    }

    #[test]
    fn labels_stay_in_range() {
        let scores = Array2::from_shape_fn((40, 5), |(i, j)| ((i * 7 + j * 3) % 11) as f64);
        let labels = reassign_labels(&scores, None);
        assert!(labels.iter().all(|&label| label < 5));
    }

    #[test]
    fn grouped_points_share_the_group_mean_argmin() {
        // Individually the first two points prefer cluster 1, but the group
        // mean [2/3, 10/3] makes cluster 0 the best joint choice.
        let scores = array![[1.0, 0.0], [1.0, 0.0], [0.0, 10.0]];
        let groups = array![0, 0, 0];
        assert_eq!(reassign_labels(&scores, Some(&groups)), array![0, 0, 0]);
    }

    #[test]
    fn groups_are_labelled_independently() {
        let scores = array![[0.0, 5.0], [0.0, 5.0], [5.0, 0.0], [5.0, 0.0]];
        let groups = array![0, 0, 1, 1];
        assert_eq!(reassign_labels(&scores, Some(&groups)), array![0, 0, 1, 1]);
    }

    #[test]
    fn missing_group_ids_are_skipped() {
        let scores = array![[1.0, 0.0], [0.0, 1.0], [0.0, 2.0]];
        let groups = array![0, 2, 2];
        let labels = reassign_labels(&scores, Some(&groups));
        assert_eq!(labels, array![1, 0, 0]);
    }

    #[test]
    fn memberships_partition_the_points() {
        let labels = array![0, 2, 2, 1, 0];
        let memberships = cluster_memberships(&labels, 3);
        assert_eq!(memberships[0], vec![0, 4]);
        assert_eq!(memberships[1], vec![3]);
        assert_eq!(memberships[2], vec![1, 2]);
    }
}

use super::*;

fn step_data() -> (Matrix<f64>, Vector<f64>) {
    let x = Matrix::from_vec(
        8,
        2,
        vec![
            1.0, 5.0, 2.0, 3.0, 3.0, 8.0, 4.0, 1.0, //
            5.0, 7.0, 6.0, 2.0, 7.0, 6.0, 8.0, 4.0,
        ],
    )
    .expect("valid matrix");
    let y = Vector::from_slice(&[1.0, 1.0, 1.0, 1.0, 9.0, 9.0, 9.0, 9.0]);
    (x, y)
}

// ---------------------------------------------------------------------------
// DecisionTreeRegressor
// ---------------------------------------------------------------------------

#[test]
fn test_tree_fits_step_function_exactly() {
    let (x, y) = step_data();
    let mut tree = DecisionTreeRegressor::new();
    tree.fit(&x, &y).expect("fit");
    let predictions = tree.predict(&x).expect("predict");
    assert_eq!(predictions.as_slice(), y.as_slice());
    assert_eq!(tree.tree().expect("fitted").depth(), 1);
}

#[test]
fn test_tree_importance_on_informative_feature() {
    let (x, y) = step_data();
    let mut tree = DecisionTreeRegressor::new();
    tree.fit(&x, &y).expect("fit");
    let importances = tree.feature_importances().expect("fitted");
    assert_eq!(importances, vec![1.0, 0.0]);
}

#[test]
fn test_tree_max_depth_zero_predicts_mean() {
    let (x, y) = step_data();
    let mut tree = DecisionTreeRegressor::new().with_max_depth(0);
    tree.fit(&x, &y).expect("fit");
    let predictions = tree.predict(&x).expect("predict");
    assert!(predictions.as_slice().iter().all(|&p| (p - 5.0).abs() < 1e-12));
}

#[test]
fn test_tree_min_samples_leaf_respected() {
    let x = Matrix::from_vec(5, 1, vec![1.0, 2.0, 3.0, 4.0, 5.0]).expect("matrix");
    let y = Vector::from_slice(&[0.0, 0.0, 0.0, 0.0, 100.0]);
    let mut tree = DecisionTreeRegressor::new().with_min_samples_leaf(2);
    tree.fit(&x, &y).expect("fit");
    fn min_leaf(node: &RegressionTreeNode) -> usize {
        match node {
            RegressionTreeNode::Leaf(l) => l.n_samples,
            RegressionTreeNode::Node(n) => min_leaf(&n.left).min(min_leaf(&n.right)),
        }
    }
    assert!(min_leaf(tree.tree().expect("fitted")) >= 2);
}

#[test]
fn test_tree_constant_target_is_single_leaf() {
    let x = Matrix::from_vec(3, 1, vec![1.0, 2.0, 3.0]).expect("matrix");
    let y = Vector::from_slice(&[4.0, 4.0, 4.0]);
    let mut tree = DecisionTreeRegressor::new();
    tree.fit(&x, &y).expect("fit");
    assert_eq!(tree.tree().expect("fitted").n_leaves(), 1);
    assert_eq!(tree.feature_importances(), Some(vec![0.0]));
}

#[test]
fn test_tree_predict_before_fit() {
    let tree = DecisionTreeRegressor::new();
    let x = Matrix::from_vec(1, 1, vec![0.0]).expect("matrix");
    assert!(matches!(
        tree.predict(&x),
        Err(CosechaError::NotFitted { .. })
    ));
    assert!(tree.feature_importances().is_none());
}

#[test]
fn test_tree_rejects_width_change() {
    let (x, y) = step_data();
    let mut tree = DecisionTreeRegressor::new();
    tree.fit(&x, &y).expect("fit");
    let narrow = Matrix::from_vec(1, 1, vec![0.0]).expect("matrix");
    assert!(matches!(
        tree.predict(&narrow),
        Err(CosechaError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_tree_rejects_mismatched_fit() {
    let x = Matrix::from_vec(2, 1, vec![0.0, 1.0]).expect("matrix");
    let y = Vector::from_slice(&[1.0]);
    assert!(DecisionTreeRegressor::new().fit(&x, &y).is_err());
}

// ---------------------------------------------------------------------------
// RandomForestRegressor
// ---------------------------------------------------------------------------

#[test]
fn test_forest_is_reproducible_with_seed() {
    let (x, y) = step_data();
    let mut a = RandomForestRegressor::new(15).with_random_state(42);
    let mut b = RandomForestRegressor::new(15).with_random_state(42);
    a.fit(&x, &y).expect("fit");
    b.fit(&x, &y).expect("fit");
    assert_eq!(
        a.predict(&x).expect("predict").as_slice(),
        b.predict(&x).expect("predict").as_slice()
    );
    assert_eq!(a.feature_importances(), b.feature_importances());
}

#[test]
fn test_forest_separates_step() {
    let (x, y) = step_data();
    let mut forest = RandomForestRegressor::new(30).with_random_state(1);
    forest.fit(&x, &y).expect("fit");
    let predictions = forest.predict(&x).expect("predict");
    let predictions = predictions.as_slice();
    assert!(predictions[0] < 5.0);
    assert!(predictions[7] > 5.0);
    let r2 = forest.score(&x, &y).expect("score").expect("targets vary");
    assert!(r2 > 0.5, "r2 = {r2}");
}

#[test]
fn test_forest_importances_normalized() {
    let (x, y) = step_data();
    let mut forest = RandomForestRegressor::default().with_random_state(3);
    forest.fit(&x, &y).expect("fit");
    let importances = forest.feature_importances().expect("fitted");
    assert_eq!(importances.len(), 2);
    assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    assert!(importances[0] > importances[1]);
}

#[test]
fn test_forest_requires_trees() {
    let (x, y) = step_data();
    assert!(RandomForestRegressor::new(0).fit(&x, &y).is_err());
    assert!(matches!(
        RandomForestRegressor::new(5).predict(&x),
        Err(CosechaError::NotFitted { .. })
    ));
}

#[test]
fn test_forest_serde_round_trip() {
    let (x, y) = step_data();
    let mut forest = RandomForestRegressor::new(5).with_random_state(9);
    forest.fit(&x, &y).expect("fit");
    let json = serde_json::to_string(&forest).expect("serialize");
    let back: RandomForestRegressor = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(
        back.predict(&x).expect("predict").as_slice(),
        forest.predict(&x).expect("predict").as_slice()
    );
}

use relframe_error::Result;

use super::aggregate::{AggregateExpr, group_aggregate};
use crate::config::execution::ExecutionConfig;
use crate::relation::Relation;

/// Count rows per group, producing the key columns and `n`.
pub fn count(relation: &Relation, keys: &[&str]) -> Result<Relation> {
    group_aggregate(
        relation,
        keys,
        &[AggregateExpr::count()],
        &ExecutionConfig::default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::array::Array;

    #[test]
    fn count_matches_group_aggregate() {
        let rel = Relation::try_new([
            ("origin", Array::from_iter(["EWR", "LGA", "EWR", "JFK"])),
            ("dest", Array::from_iter(["IAH", "IAH", "MIA", "BQN"])),
        ])
        .unwrap();

        let counted = count(&rel, &["origin"]).unwrap();
        let grouped = rel
            .group_aggregate(&["origin"], &[AggregateExpr::count().alias("n")])
            .unwrap();
        assert_eq!(grouped, counted);
        assert_eq!(&Array::from_iter([2_i64, 1, 1]), counted.column("n").unwrap());
    }

    #[test]
    fn count_no_keys() {
        let rel = Relation::new_without_columns(5);
        let out = count(&rel, &[]).unwrap();
        assert_eq!(&Array::from_iter([5_i64]), out.column("n").unwrap());
    }
}

//! Join planning over the relation graph.
//!
//! Given a set of `cube.column` references, finds a start cube that reaches
//! every referenced cube and the joins needed to get there, then renders
//! them as SQL text. Nothing is executed.

use std::collections::HashSet;

use super::graph::RelationGraph;
use super::{Cardinality, Model, ModelError, ModelResult};

/// One JOIN step: `<kind> to_cube ON from_cube.left_column = to_cube.right_column`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub from_cube: String,
    pub to_cube: String,
    pub left_column: String,
    pub right_column: String,
    pub cardinality: Cardinality,
}

impl Join {
    /// Render the JOIN clause.
    pub fn to_sql(&self) -> String {
        format!(
            "{} {} ON {}.{} = {}.{}",
            self.cardinality.sql_join(),
            self.to_cube,
            self.from_cube,
            self.left_column,
            self.to_cube,
            self.right_column
        )
    }
}

impl Model {
    /// Ordered joins needed to query `selected` (`"cube.column"` references).
    ///
    /// Returns an empty list when only one cube is involved.
    pub fn join_path<S: AsRef<str>>(&self, selected: &[S]) -> ModelResult<Vec<Join>> {
        let needed = self.selected_cubes(selected)?;
        if needed.len() == 1 {
            return Ok(Vec::new());
        }

        let start = self.join_start(&needed)?;
        let graph = RelationGraph::build(self, None);
        let parents = graph.bfs_parents(&start);

        let mut joined: HashSet<String> = HashSet::from([start.clone()]);
        let mut joins = Vec::new();

        for target in needed.iter().filter(|c| **c != start) {
            let mut path = Vec::new();
            let mut current = target.as_str();
            while current != start && !joined.contains(current) {
                let Some(&id) = parents.get(current) else {
                    break;
                };
                let rel = self.relation(id)?;
                path.push(Join {
                    from_cube: rel.left_cube().to_string(),
                    to_cube: rel.right_cube().to_string(),
                    left_column: rel.left_column().to_string(),
                    right_column: rel.right_column().to_string(),
                    cardinality: rel.cardinality(),
                });
                current = rel.left_cube();
            }

            for join in path.into_iter().rev() {
                if joined.insert(join.to_cube.clone()) {
                    joins.push(join);
                }
            }
        }

        Ok(joins)
    }

    /// SQL text selecting `selected` with the joins from [`Model::join_path`].
    ///
    /// A single-cube selection lists every column of that cube.
    pub fn generate_sql<S: AsRef<str>>(&self, selected: &[S]) -> ModelResult<String> {
        let joins = self.join_path(selected)?;

        let Some(first) = joins.first() else {
            // join_path succeeded, so there is exactly one cube
            let needed = self.selected_cubes(selected)?;
            let cube = self.get_cube(&needed[0])?;
            let columns: Vec<String> = cube
                .columns()
                .iter()
                .map(|c| format!("{}.{}", cube.name(), c))
                .collect();
            return Ok(format!("SELECT {}\nFROM {}", columns.join(", "), cube.name()));
        };

        let selected: Vec<&str> = selected.iter().map(|s| s.as_ref()).collect();
        let mut lines = vec![
            format!("SELECT {}", selected.join(", ")),
            format!("FROM {}", first.from_cube),
        ];
        lines.extend(joins.iter().map(Join::to_sql));
        Ok(lines.join("\n"))
    }

    /// Distinct cubes referenced by `selected`, in first-mention order.
    fn selected_cubes<S: AsRef<str>>(&self, selected: &[S]) -> ModelResult<Vec<String>> {
        if selected.is_empty() {
            return Err(ModelError::validation("No columns selected"));
        }

        let mut cubes: Vec<String> = Vec::new();
        for col_ref in selected {
            let col_ref = col_ref.as_ref();
            let (cube_name, column) = col_ref.split_once('.').ok_or_else(|| {
                ModelError::validation(format!("Invalid column format: {}", col_ref))
            })?;
            let cube = self
                .get_cube(cube_name)
                .map_err(|_| ModelError::validation(format!("Cube '{}' not found", cube_name)))?;
            if !cube.has_column(column) {
                return Err(ModelError::validation(format!(
                    "Column '{}' not found in cube '{}'",
                    column, cube_name
                )));
            }
            if !cubes.iter().any(|c| c == cube_name) {
                cubes.push(cube_name.to_string());
            }
        }
        Ok(cubes)
    }

    /// The cube reaching all of `needed` with the fewest total joins.
    ///
    /// Ties go to the cube added to the model first.
    fn join_start(&self, needed: &[String]) -> ModelResult<String> {
        let graph = RelationGraph::build(self, None);
        let mut best: Option<(&str, usize)> = None;

        for candidate in self.cube_names() {
            let reachable = graph.distances_from(candidate);
            let mut cost = 0;
            let mut reaches_all = true;
            for cube in needed.iter().filter(|c| *c != candidate) {
                match reachable.get(cube) {
                    Some(dist) => cost += dist,
                    None => {
                        reaches_all = false;
                        break;
                    }
                }
            }
            if reaches_all && best.map_or(true, |(_, c)| cost < c) {
                best = Some((candidate, cost));
            }
        }

        best.map(|(name, _)| name.to_string()).ok_or_else(|| {
            ModelError::validation("No cube can reach all selected cubes. Check reachability.")
        })
    }
}

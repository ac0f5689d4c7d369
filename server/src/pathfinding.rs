//! A* over the waypoint graph.
//!
//! The graph is small, so the open set is a plain `Vec` scanned for the lowest
//! f-score; the earliest inserted node wins ties.

use crate::map::Waypoint;

#[derive(Clone, Copy)]
struct Node {
    g: f32,
    f: f32,
    parent: Option<usize>,
    closed: bool,
}

/// Shortest route from `start` to `goal` as a list of waypoint indices,
/// both ends included. Empty when either index is out of range or the goal
/// is unreachable.
pub fn find_path(waypoints: &[Waypoint], start: usize, goal: usize) -> Vec<usize> {
    if start >= waypoints.len() || goal >= waypoints.len() {
        return Vec::new();
    }
    if start == goal {
        return vec![start];
    }

    let heuristic = |i: usize| waypoints[i].position.distance(waypoints[goal].position);

    let mut nodes = vec![
        Node {
            g: f32::INFINITY,
            f: f32::INFINITY,
            parent: None,
            closed: false,
        };
        waypoints.len()
    ];
    nodes[start].g = 0.0;
    nodes[start].f = heuristic(start);

    let mut open = vec![start];

    while !open.is_empty() {
        let mut best = 0;
        for i in 1..open.len() {
            if nodes[open[i]].f < nodes[open[best]].f {
                best = i;
            }
        }
        let current = open.remove(best);

        if current == goal {
            return reconstruct(&nodes, goal);
        }
        nodes[current].closed = true;

        for &neighbor in &waypoints[current].neighbors {
            if nodes[neighbor].closed {
                continue;
            }
            let tentative = nodes[current].g
                + waypoints[current]
                    .position
                    .distance(waypoints[neighbor].position);
            if tentative < nodes[neighbor].g {
                nodes[neighbor].parent = Some(current);
                nodes[neighbor].g = tentative;
                nodes[neighbor].f = tentative + heuristic(neighbor);
                if !open.contains(&neighbor) {
                    open.push(neighbor);
                }
            }
        }
    }

    Vec::new()
}

fn reconstruct(nodes: &[Node], goal: usize) -> Vec<usize> {
    let mut path = vec![goal];
    let mut cursor = nodes[goal].parent;
    while let Some(node) = cursor {
        path.push(node);
        cursor = nodes[node].parent;
    }
    path.reverse();
    path
}

/// Total edge length along a path.
pub fn path_length(waypoints: &[Waypoint], path: &[usize]) -> f32 {
    path.windows(2)
        .map(|w| waypoints[w[0]].position.distance(waypoints[w[1]].position))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::GameMap;
    use assert_approx_eq::assert_approx_eq;
    use shared::Vec3;

    /// Square with a long detour:
    ///
    /// ```text
    /// 0 ---- 1
    /// |      |
    /// 3 ---- 2     4 -- 5 (separate island)
    /// ```
    /// plus a spur 0 -> 6 -> 2 that is shorter than going around.
    fn sample_graph() -> GameMap {
        let mut map = GameMap::new();
        let a = map.add_waypoint(Vec3::new(0.0, 0.0, 0.0));
        let b = map.add_waypoint(Vec3::new(10.0, 0.0, 0.0));
        let c = map.add_waypoint(Vec3::new(10.0, 0.0, 10.0));
        let d = map.add_waypoint(Vec3::new(0.0, 0.0, 10.0));
        let e = map.add_waypoint(Vec3::new(50.0, 0.0, 50.0));
        let f = map.add_waypoint(Vec3::new(60.0, 0.0, 50.0));
        let mid = map.add_waypoint(Vec3::new(5.0, 0.0, 5.0));
        map.link(a, b);
        map.link(b, c);
        map.link(c, d);
        map.link(d, a);
        map.link(e, f);
        map.link(a, mid);
        map.link(mid, c);
        map
    }

    #[test]
    fn test_shortest_route_is_exact() {
        let map = sample_graph();
        let path = find_path(map.waypoints(), 0, 2);
        assert_eq!(path, vec![0, 6, 2]);
        assert_approx_eq!(path_length(map.waypoints(), &path), 200f32.sqrt(), 1e-4);
    }

    #[test]
    fn test_adjacent_nodes() {
        let map = sample_graph();
        assert_eq!(find_path(map.waypoints(), 3, 0), vec![3, 0]);
    }

    #[test]
    fn test_disconnected_components() {
        let map = sample_graph();
        assert!(find_path(map.waypoints(), 0, 4).is_empty());
        assert!(find_path(map.waypoints(), 5, 1).is_empty());
    }

    #[test]
    fn test_start_equals_goal() {
        let map = sample_graph();
        assert_eq!(find_path(map.waypoints(), 4, 4), vec![4]);
    }

    #[test]
    fn test_out_of_range_indices() {
        let map = sample_graph();
        assert!(find_path(map.waypoints(), 0, 99).is_empty());
        assert!(find_path(&[], 0, 0).is_empty());
    }

    #[test]
    fn test_arctic_graph_is_connected() {
        let map = GameMap::arctic();
        let wps = map.waypoints();
        for goal in 0..wps.len() {
            let path = find_path(wps, 0, goal);
            assert!(!path.is_empty(), "no route to {}", goal);
            assert_eq!(path.first(), Some(&0));
            assert_eq!(path.last(), Some(&goal));
        }
    }
}

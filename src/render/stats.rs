use std::fmt;

/// The number of buckets of the rate histograms. Bucket `i` counts the updates (or frames)
/// that ran at `i` per second, the last bucket everything faster.
pub const RATE_BUCKETS: usize = 80;

/// Counters of the work done by updates and frames.
///
/// Counters accumulate until `reset` is called, so averages cover the whole interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceStats {
    updates_handled: u32,
    accumulated_update_time: f32,
    nodes_updated: u32,
    nodes_transformed: u32,

    frames_handled: u32,
    accumulated_frame_time: f32,
    nodes_visited_for_drawing: u32,
    nodes_drawn: u32,
    drawing_calls_made: u32,
    faces_presented: u32,

    update_rate_histogram: Vec<u32>,
    frame_rate_histogram: Vec<u32>,
}

impl Default for PerformanceStats {
    fn default() -> Self {
        PerformanceStats {
            updates_handled: 0,
            accumulated_update_time: 0.0,
            nodes_updated: 0,
            nodes_transformed: 0,
            frames_handled: 0,
            accumulated_frame_time: 0.0,
            nodes_visited_for_drawing: 0,
            nodes_drawn: 0,
            drawing_calls_made: 0,
            faces_presented: 0,
            update_rate_histogram: vec![0; RATE_BUCKETS],
            frame_rate_histogram: vec![0; RATE_BUCKETS],
        }
    }
}

#[inline]
fn bucket(dt: f32) -> usize {
    if dt <= 0.0 {
        return RATE_BUCKETS - 1;
    }

    ((1.0 / dt) as usize).min(RATE_BUCKETS - 1)
}

impl PerformanceStats {
    /// Records one update of `dt` seconds.
    pub fn add_update(&mut self, dt: f32) {
        self.updates_handled += 1;
        self.accumulated_update_time += dt;
        self.update_rate_histogram[bucket(dt)] += 1;
    }

    #[inline]
    pub fn add_nodes_updated(&mut self, count: u32) {
        self.nodes_updated += count;
    }

    #[inline]
    pub fn add_nodes_transformed(&mut self, count: u32) {
        self.nodes_transformed += count;
    }

    /// Records one completed frame of `dt` seconds.
    pub fn add_frame(&mut self, dt: f32) {
        self.frames_handled += 1;
        self.accumulated_frame_time += dt;
        self.frame_rate_histogram[bucket(dt)] += 1;
    }

    #[inline]
    pub fn add_node_visited_for_drawing(&mut self) {
        self.nodes_visited_for_drawing += 1;
    }

    #[inline]
    pub fn add_node_drawn(&mut self) {
        self.nodes_drawn += 1;
    }

    /// Records one draw call that presented `faces` faces.
    #[inline]
    pub fn add_draw_call(&mut self, faces: u32) {
        self.drawing_calls_made += 1;
        self.faces_presented += faces;
    }

    #[inline]
    pub fn updates_handled(&self) -> u32 {
        self.updates_handled
    }

    #[inline]
    pub fn accumulated_update_time(&self) -> f32 {
        self.accumulated_update_time
    }

    #[inline]
    pub fn nodes_updated(&self) -> u32 {
        self.nodes_updated
    }

    #[inline]
    pub fn nodes_transformed(&self) -> u32 {
        self.nodes_transformed
    }

    #[inline]
    pub fn frames_handled(&self) -> u32 {
        self.frames_handled
    }

    #[inline]
    pub fn accumulated_frame_time(&self) -> f32 {
        self.accumulated_frame_time
    }

    #[inline]
    pub fn nodes_visited_for_drawing(&self) -> u32 {
        self.nodes_visited_for_drawing
    }

    #[inline]
    pub fn nodes_drawn(&self) -> u32 {
        self.nodes_drawn
    }

    #[inline]
    pub fn drawing_calls_made(&self) -> u32 {
        self.drawing_calls_made
    }

    #[inline]
    pub fn faces_presented(&self) -> u32 {
        self.faces_presented
    }

    #[inline]
    pub fn update_rate_histogram(&self) -> &[u32] {
        &self.update_rate_histogram
    }

    #[inline]
    pub fn frame_rate_histogram(&self) -> &[u32] {
        &self.frame_rate_histogram
    }

    /// Updates per second.
    pub fn update_rate(&self) -> f32 {
        ratio(self.updates_handled as f32, self.accumulated_update_time)
    }

    /// Frames per second.
    pub fn frame_rate(&self) -> f32 {
        ratio(self.frames_handled as f32, self.accumulated_frame_time)
    }

    pub fn average_nodes_updated_per_update(&self) -> f32 {
        ratio(self.nodes_updated as f32, self.updates_handled as f32)
    }

    pub fn average_nodes_transformed_per_update(&self) -> f32 {
        ratio(self.nodes_transformed as f32, self.updates_handled as f32)
    }

    pub fn average_nodes_visited_per_frame(&self) -> f32 {
        ratio(self.nodes_visited_for_drawing as f32, self.frames_handled as f32)
    }

    pub fn average_nodes_drawn_per_frame(&self) -> f32 {
        ratio(self.nodes_drawn as f32, self.frames_handled as f32)
    }

    pub fn average_drawing_calls_per_frame(&self) -> f32 {
        ratio(self.drawing_calls_made as f32, self.frames_handled as f32)
    }

    pub fn average_faces_per_frame(&self) -> f32 {
        ratio(self.faces_presented as f32, self.frames_handled as f32)
    }

    /// Resets every counter and histogram.
    pub fn reset(&mut self) {
        *self = PerformanceStats::default();
    }
}

#[inline]
fn ratio(a: f32, b: f32) -> f32 {
    if b > 0.0 {
        a / b
    } else {
        0.0
    }
}

impl fmt::Display for PerformanceStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "fps: {:.1}, ups: {:.1}, nodes drawn: {:.1}, draw calls: {:.1}, faces: {:.1}",
            self.frame_rate(),
            self.update_rate(),
            self.average_nodes_drawn_per_frame(),
            self.average_drawing_calls_per_frame(),
            self.average_faces_per_frame()
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn averages() {
        let mut stats = PerformanceStats::default();
        for _ in 0..4 {
            stats.add_update(0.25);
            stats.add_nodes_updated(3);
            stats.add_frame(0.5);
            stats.add_draw_call(2);
            stats.add_node_drawn();
        }

        assert_eq!(stats.frames_handled(), 4);
        assert_ulps_eq!(stats.update_rate(), 4.0);
        assert_ulps_eq!(stats.frame_rate(), 2.0);
        assert_ulps_eq!(stats.average_nodes_updated_per_update(), 3.0);
        assert_ulps_eq!(stats.average_faces_per_frame(), 2.0);
        assert_eq!(stats.update_rate_histogram()[4], 4);
        assert_eq!(stats.frame_rate_histogram()[2], 4);

        stats.reset();
        assert_eq!(stats, PerformanceStats::default());
        assert_eq!(stats.frame_rate(), 0.0);
    }

    #[test]
    fn histogram_clamps() {
        let mut stats = PerformanceStats::default();
        stats.add_frame(1.0 / 500.0);
        stats.add_frame(0.0);
        stats.add_frame(2.0);

        assert_eq!(stats.frame_rate_histogram()[RATE_BUCKETS - 1], 2);
        assert_eq!(stats.frame_rate_histogram()[0], 1);
    }
}

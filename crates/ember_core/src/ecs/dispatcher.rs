//! Tag-constrained system scheduling.
//!
//! Systems and tags form a directed graph: a system can run before or
//! after a named tag, belong to a tag, and tags can be ordered relative
//! to each other, chaining transitively. [`Dispatcher::compile_chain`]
//! linearizes the graph once with a deterministic topological sort;
//! [`Dispatcher::call_systems`] then replays the chain every tick.
//!
//! Registration is builder-flavoured: `add_system`/`add_tag` make a node
//! current and the `system_*`/`tag_*` methods attach constraints to it.

use std::collections::{BTreeSet, HashMap};

use super::{CommandBuffer, World};

type SystemFn = Box<dyn FnMut(&mut World, &mut CommandBuffer) + Send>;

struct SystemNode {
    name: String,
    run: SystemFn,
    tags: Vec<String>,
    before: Vec<String>,
    after: Vec<String>,
}

struct TagNode {
    name: String,
    before: Vec<String>,
    after: Vec<String>,
}

enum Current {
    System(usize),
    Tag(usize),
}

/// Compiles registered systems into a fixed execution chain and replays
/// it. Startup and main schedules are independent dispatcher instances
/// with independent tag namespaces.
#[derive(Default)]
pub struct Dispatcher {
    systems: Vec<SystemNode>,
    tags: Vec<TagNode>,
    tag_index: HashMap<String, usize>,
    current: Option<Current>,
    chain: Option<Vec<usize>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tag node if absent and make it current.
    pub fn add_tag(&mut self, tag: &str) {
        let index = self.ensure_tag(tag);
        self.current = Some(Current::Tag(index));
    }

    /// Constrain the current tag to run before `tag`.
    pub fn tag_set_before_tag(&mut self, tag: &str) {
        self.ensure_tag(tag);
        let index = self.current_tag("cannot order a tag: no tag is being configured");
        self.tags[index].before.push(tag.to_string());
    }

    /// Constrain the current tag to run after `tag`.
    pub fn tag_set_after_tag(&mut self, tag: &str) {
        self.ensure_tag(tag);
        let index = self.current_tag("cannot order a tag: no tag is being configured");
        self.tags[index].after.push(tag.to_string());
    }

    /// Register a system and make it current.
    pub fn add_system<F>(&mut self, name: &str, system: F)
    where
        F: FnMut(&mut World, &mut CommandBuffer) + Send + 'static,
    {
        self.systems.push(SystemNode {
            name: name.to_string(),
            run: Box::new(system),
            tags: Vec::new(),
            before: Vec::new(),
            after: Vec::new(),
        });
        self.current = Some(Current::System(self.systems.len() - 1));
    }

    /// Make the current system a member of `tag`, inheriting the tag's
    /// ordering constraints.
    pub fn system_add_tag(&mut self, tag: &str) {
        self.ensure_tag(tag);
        let index = self.current_system("cannot tag: no system is being configured");
        self.systems[index].tags.push(tag.to_string());
    }

    /// Constrain the current system to run before `tag`.
    pub fn system_set_before_tag(&mut self, tag: &str) {
        self.ensure_tag(tag);
        let index = self.current_system("cannot order a system: no system is being configured");
        self.systems[index].before.push(tag.to_string());
    }

    /// Constrain the current system to run after `tag`.
    pub fn system_set_after_tag(&mut self, tag: &str) {
        self.ensure_tag(tag);
        let index = self.current_system("cannot order a system: no system is being configured");
        self.systems[index].after.push(tag.to_string());
    }

    /// Number of registered systems.
    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Resolve every constraint into a linear execution chain.
    ///
    /// The sort is deterministic: systems with no ordering constraint
    /// between them keep their registration order.
    ///
    /// # Panics
    ///
    /// Panics on a constraint cycle, naming an involved node, or when the
    /// chain was already compiled.
    pub fn compile_chain(&mut self) {
        assert!(
            self.chain.is_none(),
            "execution chain was already compiled"
        );

        // Graph nodes: one per system, then a start/end pair per tag.
        // Members of a tag sit between its start and end node, so
        // tag-level edges order whole groups.
        let system_count = self.systems.len();
        let node_count = system_count + 2 * self.tags.len();
        let tag_start = |tag: usize| system_count + 2 * tag;
        let tag_end = |tag: usize| system_count + 2 * tag + 1;

        let mut edges = BTreeSet::new();
        for tag in 0..self.tags.len() {
            edges.insert((tag_start(tag), tag_end(tag)));
        }
        for (tag_idx, tag) in self.tags.iter().enumerate() {
            for other in &tag.before {
                edges.insert((tag_end(tag_idx), tag_start(self.tag_index[other])));
            }
            for other in &tag.after {
                edges.insert((tag_end(self.tag_index[other]), tag_start(tag_idx)));
            }
        }
        for (sys_idx, system) in self.systems.iter().enumerate() {
            for tag in &system.tags {
                let tag = self.tag_index[tag];
                edges.insert((tag_start(tag), sys_idx));
                edges.insert((sys_idx, tag_end(tag)));
            }
            for tag in &system.before {
                edges.insert((sys_idx, tag_start(self.tag_index[tag])));
            }
            for tag in &system.after {
                edges.insert((tag_end(self.tag_index[tag]), sys_idx));
            }
        }

        let mut successors = vec![Vec::new(); node_count];
        let mut indegree = vec![0usize; node_count];
        for &(from, to) in &edges {
            successors[from].push(to);
            indegree[to] += 1;
        }

        // Priority of a node: the smallest registration index among the
        // systems reachable from it. Group nodes inherit the index of
        // their earliest downstream member, so tag membership alone never
        // delays a system behind later-registered unconstrained ones.
        let mut priority = vec![usize::MAX; node_count];
        for node in 0..system_count {
            priority[node] = node;
        }
        let mut changed = true;
        while changed {
            changed = false;
            for &(from, to) in &edges {
                if priority[to] < priority[from] {
                    priority[from] = priority[to];
                    changed = true;
                }
            }
        }

        // Kahn's algorithm over a min-heap keyed by priority, so ties
        // fall back to registration order.
        let mut ready = std::collections::BinaryHeap::new();
        for (node, &degree) in indegree.iter().enumerate() {
            if degree == 0 {
                ready.push(std::cmp::Reverse((priority[node], node)));
            }
        }

        let mut chain = Vec::with_capacity(system_count);
        let mut emitted = 0;
        while let Some(std::cmp::Reverse((_, node))) = ready.pop() {
            emitted += 1;
            if node < system_count {
                chain.push(node);
            }
            for &next in &successors[node] {
                indegree[next] -= 1;
                if indegree[next] == 0 {
                    ready.push(std::cmp::Reverse((priority[next], next)));
                }
            }
        }

        if emitted != node_count {
            let stuck = indegree
                .iter()
                .enumerate()
                .find(|(_, &degree)| degree > 0)
                .map(|(node, _)| self.node_name(node, system_count))
                .unwrap_or_else(|| "<unknown>".to_string());
            panic!("cycle detected in ordering constraints involving '{stuck}'");
        }

        self.chain = Some(chain);
    }

    /// Execute the compiled chain strictly in order, committing the
    /// command buffer after each system.
    ///
    /// # Panics
    ///
    /// Panics if [`Dispatcher::compile_chain`] was never called.
    pub fn call_systems(&mut self, world: &mut World, commands: &mut CommandBuffer) {
        let chain = self
            .chain
            .clone()
            .unwrap_or_else(|| panic!("execution chain was not compiled"));
        for index in chain {
            (self.systems[index].run)(world, commands);
            commands.commit(world);
        }
    }

    fn ensure_tag(&mut self, tag: &str) -> usize {
        if let Some(&index) = self.tag_index.get(tag) {
            return index;
        }
        let index = self.tags.len();
        self.tags.push(TagNode {
            name: tag.to_string(),
            before: Vec::new(),
            after: Vec::new(),
        });
        self.tag_index.insert(tag.to_string(), index);
        index
    }

    fn current_system(&self, message: &str) -> usize {
        match self.current {
            Some(Current::System(index)) => index,
            _ => panic!("{message}"),
        }
    }

    fn current_tag(&self, message: &str) -> usize {
        match self.current {
            Some(Current::Tag(index)) => index,
            _ => panic!("{message}"),
        }
    }

    fn node_name(&self, node: usize, system_count: usize) -> String {
        if node < system_count {
            self.systems[node].name.clone()
        } else {
            self.tags[(node - system_count) / 2].name.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, label: &'static str) -> impl FnMut(&mut World, &mut CommandBuffer) + Send {
        let log = Arc::clone(log);
        move |_world, _commands| log.lock().unwrap().push(label)
    }

    fn run(dispatcher: &mut Dispatcher) {
        let mut world = World::new();
        let mut commands = CommandBuffer::new();
        dispatcher.compile_chain();
        dispatcher.call_systems(&mut world, &mut commands);
    }

    #[test]
    fn unconstrained_systems_keep_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();
        dispatcher.add_system("a", recorder(&log, "a"));
        dispatcher.add_system("b", recorder(&log, "b"));
        dispatcher.add_system("c", recorder(&log, "c"));

        run(&mut dispatcher);
        assert_eq!(*log.lock().unwrap(), ["a", "b", "c"]);
    }

    #[test]
    fn before_and_after_tags_reorder_systems() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();

        dispatcher.add_system("late", recorder(&log, "late"));
        dispatcher.system_set_after_tag("checkpoint");

        dispatcher.add_system("early", recorder(&log, "early"));
        dispatcher.system_set_before_tag("checkpoint");

        run(&mut dispatcher);
        assert_eq!(*log.lock().unwrap(), ["early", "late"]);
    }

    #[test]
    fn tag_to_tag_edges_order_whole_groups() {
        // Tag "a" runs before tag "b"; membership alone must order the
        // systems, regardless of registration order.
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();

        dispatcher.add_tag("a");
        dispatcher.tag_set_before_tag("b");

        dispatcher.add_system("s1", recorder(&log, "s1"));
        dispatcher.system_add_tag("b");

        dispatcher.add_system("s2", recorder(&log, "s2"));
        dispatcher.system_add_tag("a");

        run(&mut dispatcher);
        assert_eq!(*log.lock().unwrap(), ["s2", "s1"]);
    }

    #[test]
    fn membership_alone_does_not_delay_a_system() {
        // A tag with no ordering edges must not push its members behind
        // later-registered unconstrained systems.
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();

        dispatcher.add_system("first", recorder(&log, "first"));
        dispatcher.system_add_tag("group");
        dispatcher.add_system("second", recorder(&log, "second"));

        run(&mut dispatcher);
        assert_eq!(*log.lock().unwrap(), ["first", "second"]);
    }

    #[test]
    fn compilation_is_deterministic() {
        let build = || {
            let log = Arc::new(Mutex::new(Vec::new()));
            let mut dispatcher = Dispatcher::new();
            dispatcher.add_tag("sim");
            dispatcher.tag_set_after_tag("input");
            dispatcher.add_system("render", recorder(&log, "render"));
            dispatcher.system_set_after_tag("sim");
            dispatcher.add_system("physics", recorder(&log, "physics"));
            dispatcher.system_add_tag("sim");
            dispatcher.add_system("poll", recorder(&log, "poll"));
            dispatcher.system_add_tag("input");
            run(&mut dispatcher);
            drop(dispatcher);
            Arc::try_unwrap(log).unwrap().into_inner().unwrap()
        };
        let first = build();
        assert_eq!(first, build());
        assert_eq!(first, ["poll", "physics", "render"]);
    }

    #[test]
    #[should_panic(expected = "cycle detected")]
    fn constraint_cycle_fails_fast() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.add_tag("a");
        dispatcher.tag_set_before_tag("b");
        dispatcher.add_tag("b");
        dispatcher.tag_set_before_tag("a");
        dispatcher.add_system("stuck", |_, _| {});
        dispatcher.system_add_tag("a");
        dispatcher.compile_chain();
    }

    #[test]
    #[should_panic(expected = "already compiled")]
    fn compiling_twice_is_rejected() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.add_system("only", |_, _| {});
        dispatcher.compile_chain();
        dispatcher.compile_chain();
    }

    #[test]
    #[should_panic(expected = "no system is being configured")]
    fn tagging_without_a_system_is_rejected() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.system_add_tag("orphan");
    }
}

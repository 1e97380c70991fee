//! Periodic clique-based group formation.
//!
//! A sweep rebuilds the mutual-like graph from scratch, enumerates its
//! maximal cliques, and materialises bounded-size groups for cliques that
//! are not already realised. Re-running on an unchanged graph is a no-op:
//! the member-set-equality check, not locking, is what makes the job safe
//! to schedule aggressively.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use petgraph::algo::maximal_cliques;
use petgraph::graph::UnGraph;
use tracing::info;
use uuid::Uuid;

use crate::domain::Error;
use crate::domain::notifications::NotificationService;
use crate::domain::ports::{
    ConversationRepository, ConversationRepositoryError, GroupRepository, GroupRepositoryError,
    ProfileRepository, ProfileRepositoryError, SwipeRepository, SwipeRepositoryError,
};
use crate::domain::user::{Profile, UserId};

/// Smallest clique worth turning into a group.
pub const MIN_GROUP_SIZE: usize = 5;
/// Largest group produced; larger cliques are chunked.
pub const MAX_GROUP_SIZE: usize = 7;
/// How many member names the auto-generated group name includes.
const NAMED_MEMBERS: usize = 3;

/// Interest group materialised from a clique chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    /// Group identifier.
    pub id: Uuid,
    /// Auto-generated display name.
    pub name: String,
    /// Fixed description.
    pub description: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Membership row of a group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupMember {
    /// Member identifier.
    pub user: UserId,
    /// Whether the member administers the group.
    pub is_admin: bool,
    /// Whether the membership is active.
    pub is_active: bool,
    /// Join timestamp.
    pub joined_at: DateTime<Utc>,
}

/// Outcome of one grouping sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    /// Maximal cliques that met the minimum size.
    pub cliques: usize,
    /// Groups actually created this run.
    pub groups_created: usize,
}

fn map_profile_error(error: ProfileRepositoryError) -> Error {
    match error {
        ProfileRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("profile repository unavailable: {message}"))
        }
        ProfileRepositoryError::Query { message } => {
            Error::internal(format!("profile repository error: {message}"))
        }
    }
}

fn map_swipe_error(error: SwipeRepositoryError) -> Error {
    match error {
        SwipeRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("swipe repository unavailable: {message}"))
        }
        SwipeRepositoryError::Query { message } => {
            Error::internal(format!("swipe repository error: {message}"))
        }
    }
}

fn map_group_error(error: GroupRepositoryError) -> Error {
    match error {
        GroupRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("group repository unavailable: {message}"))
        }
        GroupRepositoryError::Query { message } => {
            Error::internal(format!("group repository error: {message}"))
        }
    }
}

fn map_conversation_error(error: ConversationRepositoryError) -> Error {
    match error {
        ConversationRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("conversation repository unavailable: {message}"))
        }
        ConversationRepositoryError::Query { message } => {
            Error::internal(format!("conversation repository error: {message}"))
        }
    }
}

/// Builds interest groups from the mutual-like graph.
pub struct GroupBuilder {
    profiles: Arc<dyn ProfileRepository>,
    swipes: Arc<dyn SwipeRepository>,
    groups: Arc<dyn GroupRepository>,
    conversations: Arc<dyn ConversationRepository>,
    notifications: Arc<NotificationService>,
    // Sweeps within one process never interleave; cross-process safety
    // comes from the member-set duplicate check.
    sweep: tokio::sync::Mutex<()>,
}

impl GroupBuilder {
    /// Create a new group builder.
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        swipes: Arc<dyn SwipeRepository>,
        groups: Arc<dyn GroupRepository>,
        conversations: Arc<dyn ConversationRepository>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            profiles,
            swipes,
            groups,
            conversations,
            notifications,
            sweep: tokio::sync::Mutex::new(()),
        }
    }

    /// Run one grouping sweep.
    ///
    /// Each chunk commits independently: a failure mid-run leaves the
    /// groups created so far in place, and the next run skips them via the
    /// duplicate check.
    pub async fn run_sweep(&self) -> Result<SweepReport, Error> {
        let _serialized = self.sweep.lock().await;

        let active = self
            .profiles
            .list_active()
            .await
            .map_err(map_profile_error)?;
        let pairs = self
            .swipes
            .mutual_pairs()
            .await
            .map_err(map_swipe_error)?;

        let display_names: HashMap<UserId, String> = active
            .iter()
            .map(|profile| (profile.id, profile.display_name.to_string()))
            .collect();

        let graph = build_mutual_graph(&active, &pairs);
        let mut report = SweepReport::default();

        for clique in maximal_cliques(&graph) {
            let mut members: Vec<UserId> = clique.iter().map(|index| graph[*index]).collect();
            if members.len() < MIN_GROUP_SIZE {
                continue;
            }
            members.sort_unstable();
            report.cliques += 1;

            for chunk in split_clique(&members) {
                let exists = self
                    .groups
                    .member_set_exists(chunk)
                    .await
                    .map_err(map_group_error)?;
                if exists {
                    continue;
                }
                self.materialize(chunk, &display_names).await?;
                report.groups_created += 1;
            }
        }

        info!(
            cliques = report.cliques,
            created = report.groups_created,
            "grouping sweep finished"
        );
        Ok(report)
    }

    /// Create one group, its chat, and the membership notifications.
    async fn materialize(
        &self,
        members: &[UserId],
        display_names: &HashMap<UserId, String>,
    ) -> Result<(), Error> {
        let named: Vec<&str> = members
            .iter()
            .take(NAMED_MEMBERS)
            .filter_map(|id| display_names.get(id))
            .map(String::as_str)
            .collect();
        let name = format!("{}…", named.join(", "));

        let group = self
            .groups
            .create_group(&name, "Created automatically around shared interests", members)
            .await
            .map_err(map_group_error)?;

        let chat = self
            .conversations
            .create_group_chat(group.id, members)
            .await
            .map_err(map_conversation_error)?;

        let text = format!("You have been added to a new group \"{}\"", group.name);
        for member in members {
            self.notifications.notify(member, chat.id, &text).await?;
        }
        Ok(())
    }
}

/// Undirected graph over active users with one edge per mutual-like pair.
fn build_mutual_graph(active: &[Profile], pairs: &[(UserId, UserId)]) -> UnGraph<UserId, ()> {
    let mut graph = UnGraph::new_undirected();
    let mut nodes = HashMap::with_capacity(active.len());
    for profile in active {
        nodes.insert(profile.id, graph.add_node(profile.id));
    }
    for (a, b) in pairs {
        // Edges touching deactivated users fall out of the graph here.
        if let (Some(&x), Some(&y)) = (nodes.get(a), nodes.get(b)) {
            graph.add_edge(x, y, ());
        }
    }
    graph
}

/// Split a sorted clique into contiguous chunks of at most
/// [`MAX_GROUP_SIZE`], discarding any trailing chunk smaller than
/// [`MIN_GROUP_SIZE`].
fn split_clique(members: &[UserId]) -> Vec<&[UserId]> {
    if members.len() <= MAX_GROUP_SIZE {
        return vec![members];
    }
    members
        .chunks(MAX_GROUP_SIZE)
        .filter(|chunk| chunk.len() >= MIN_GROUP_SIZE)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::notifications::Notification;
    use crate::domain::conversations::Conversation;
    use crate::domain::ports::{
        MockConversationRepository, MockGroupRepository, MockNotificationRepository,
        MockProfileRepository, MockSwipeRepository, NullEventBus,
    };
    use crate::domain::user::{DisplayName, PrivacyVector};
    use rstest::rstest;
    use std::sync::Mutex;

    fn profile(id: UserId, name: &str) -> Profile {
        Profile {
            id,
            display_name: DisplayName::new(name).expect("valid fixture name"),
            avatar_url: None,
            interest_vector: None,
            privacy: PrivacyVector::permissive(),
            location: None,
            is_active: true,
            last_seen_at: Utc::now(),
        }
    }

    fn all_pairs(ids: &[UserId]) -> Vec<(UserId, UserId)> {
        let mut pairs = Vec::new();
        for (i, a) in ids.iter().enumerate() {
            for b in ids.iter().skip(i + 1) {
                pairs.push((*a, *b));
            }
        }
        pairs
    }

    fn sorted_ids(n: usize) -> Vec<UserId> {
        let mut ids: Vec<UserId> = (0..n).map(|_| UserId::random()).collect();
        ids.sort_unstable();
        ids
    }

    #[rstest]
    #[case(5, vec![5])]
    #[case(7, vec![7])]
    #[case(9, vec![7])]
    #[case(12, vec![7, 5])]
    #[case(16, vec![7, 7])]
    fn clique_splitting_honours_bounds(#[case] size: usize, #[case] expected: Vec<usize>) {
        let members = sorted_ids(size);
        let chunks = split_clique(&members);
        let lengths: Vec<usize> = chunks.iter().map(|chunk| chunk.len()).collect();
        assert_eq!(lengths, expected);
        for chunk in &chunks {
            assert!(chunk.len() >= MIN_GROUP_SIZE && chunk.len() <= MAX_GROUP_SIZE);
        }
    }

    struct Fixture {
        profiles: MockProfileRepository,
        swipes: MockSwipeRepository,
        groups: MockGroupRepository,
        conversations: MockConversationRepository,
        notifications: MockNotificationRepository,
    }

    impl Fixture {
        fn with_clique(ids: &[UserId]) -> Self {
            let mut profiles = MockProfileRepository::new();
            let members: Vec<Profile> = ids
                .iter()
                .enumerate()
                .map(|(i, id)| profile(*id, &format!("Member {i}")))
                .collect();
            profiles
                .expect_list_active()
                .returning(move || Ok(members.clone()));

            let mut swipes = MockSwipeRepository::new();
            let pairs = all_pairs(ids);
            swipes
                .expect_mutual_pairs()
                .returning(move || Ok(pairs.clone()));

            Self {
                profiles,
                swipes,
                groups: MockGroupRepository::new(),
                conversations: MockConversationRepository::new(),
                notifications: MockNotificationRepository::new(),
            }
        }

        fn build(self) -> GroupBuilder {
            let conversations: Arc<dyn ConversationRepository> = Arc::new(self.conversations);
            let notifications = Arc::new(NotificationService::new(
                Arc::new(self.notifications),
                Arc::clone(&conversations),
                Arc::new(NullEventBus),
            ));
            GroupBuilder::new(
                Arc::new(self.profiles),
                Arc::new(self.swipes),
                Arc::new(self.groups),
                conversations,
                notifications,
            )
        }
    }

    fn group(name: &str) -> Group {
        Group {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            description: String::new(),
            created_at: Utc::now(),
        }
    }

    fn group_chat(group_id: Uuid, members: &[UserId]) -> Conversation {
        Conversation {
            id: Uuid::new_v4(),
            group_id: Some(group_id),
            participants: members.to_vec(),
            created_at: Utc::now(),
        }
    }

    fn allow_notifications(fixture: &mut Fixture) {
        fixture
            .notifications
            .expect_insert()
            .returning(|user, conversation, text| {
                Ok(Notification {
                    id: Uuid::new_v4(),
                    user: *user,
                    conversation_id: conversation,
                    text: text.to_owned(),
                    read: false,
                    created_at: Utc::now(),
                })
            });
        fixture
            .conversations
            .expect_find_by_id()
            .returning(|_| Ok(None));
    }

    #[rstest]
    #[tokio::test]
    async fn five_clique_creates_one_group_with_member_notifications() {
        let ids = sorted_ids(5);
        let mut fixture = Fixture::with_clique(&ids);
        fixture
            .groups
            .expect_member_set_exists()
            .returning(|_| Ok(false));
        fixture
            .groups
            .expect_create_group()
            .times(1)
            .returning(|name, _, _| Ok(group(name)));
        fixture
            .conversations
            .expect_create_group_chat()
            .times(1)
            .returning(|group_id, members| Ok(group_chat(group_id, members)));
        allow_notifications(&mut fixture);

        let report = fixture.build().run_sweep().await.expect("sweep succeeds");
        assert_eq!(report.cliques, 1);
        assert_eq!(report.groups_created, 1);
    }

    #[rstest]
    #[tokio::test]
    async fn existing_member_set_is_skipped() {
        let ids = sorted_ids(5);
        let mut fixture = Fixture::with_clique(&ids);
        fixture
            .groups
            .expect_member_set_exists()
            .returning(|_| Ok(true));
        fixture.groups.expect_create_group().never();

        let report = fixture.build().run_sweep().await.expect("sweep succeeds");
        assert_eq!(report.groups_created, 0);
    }

    #[rstest]
    #[tokio::test]
    async fn small_cliques_are_ignored() {
        let ids = sorted_ids(4);
        let mut fixture = Fixture::with_clique(&ids);
        fixture.groups.expect_member_set_exists().never();
        fixture.groups.expect_create_group().never();

        let report = fixture.build().run_sweep().await.expect("sweep succeeds");
        assert_eq!(report.cliques, 0);
        assert_eq!(report.groups_created, 0);
    }

    #[rstest]
    #[tokio::test]
    async fn twelve_clique_materialises_two_groups() {
        let ids = sorted_ids(12);
        let mut fixture = Fixture::with_clique(&ids);
        let chunk_sizes = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&chunk_sizes);
        fixture
            .groups
            .expect_member_set_exists()
            .returning(|_| Ok(false));
        fixture
            .groups
            .expect_create_group()
            .times(2)
            .returning(move |name, _, members| {
                seen.lock().expect("no poisoned lock").push(members.len());
                Ok(group(name))
            });
        fixture
            .conversations
            .expect_create_group_chat()
            .times(2)
            .returning(|group_id, members| Ok(group_chat(group_id, members)));
        allow_notifications(&mut fixture);

        let report = fixture.build().run_sweep().await.expect("sweep succeeds");
        assert_eq!(report.groups_created, 2);
        let sizes = chunk_sizes.lock().expect("no poisoned lock").clone();
        assert_eq!(sizes, vec![7, 5]);
    }

    #[rstest]
    #[tokio::test]
    async fn group_name_uses_up_to_three_member_names() {
        let ids = sorted_ids(5);
        let mut fixture = Fixture::with_clique(&ids);
        fixture
            .groups
            .expect_member_set_exists()
            .returning(|_| Ok(false));
        fixture
            .groups
            .expect_create_group()
            .withf(|name, _, _| name.matches(',').count() == 2 && name.ends_with('…'))
            .returning(|name, _, _| Ok(group(name)));
        fixture
            .conversations
            .expect_create_group_chat()
            .returning(|group_id, members| Ok(group_chat(group_id, members)));
        allow_notifications(&mut fixture);

        fixture.build().run_sweep().await.expect("sweep succeeds");
    }
}

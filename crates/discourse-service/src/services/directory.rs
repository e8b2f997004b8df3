//! Group directory service
//!
//! Public-group listing and creation plus the best-effort per-user
//! bookkeeping writes ("current open group", "last opened at"). The
//! bookkeeping writes never block navigation: a failure is logged and the
//! route is returned regardless.

use chrono::Utc;
use discourse_core::{GroupSummary, Route, Snowflake};
use tracing::{info, instrument, warn};

use super::context::ServiceContext;
use super::error::ServiceResult;

/// Group directory service
pub struct GroupDirectory<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> GroupDirectory<'a> {
    /// Create a new GroupDirectory
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// List the public groups visible to a user.
    ///
    /// An empty listing is a normal result, not a failure.
    #[instrument(skip(self))]
    pub async fn list_public_groups(&self, user_id: Snowflake) -> ServiceResult<Vec<GroupSummary>> {
        let groups = self.ctx.group_store().list_public().await?;

        // The index should only hold public groups; drop anything private
        // that leaked in rather than show it on the home screen
        let visible: Vec<GroupSummary> = groups.into_iter().filter(|g| !g.is_private).collect();

        tracing::debug!(
            user_id = %user_id,
            count = visible.len(),
            "Listed public groups"
        );

        Ok(visible)
    }

    /// Create a group owned by `owner_id` with the given initial members
    #[instrument(skip(self, initial_members))]
    pub async fn create_public_group(
        &self,
        owner_id: Snowflake,
        initial_members: Vec<Snowflake>,
        is_private: bool,
    ) -> ServiceResult<GroupSummary> {
        let id = self.ctx.generate_id();
        let group = GroupSummary::new(id, is_private).with_members(initial_members);

        self.ctx.group_store().create(&group).await?;

        info!(
            group_id = %group.id,
            owner_id = %owner_id,
            is_private = is_private,
            members = group.member_count(),
            "Group created"
        );

        Ok(group)
    }

    /// Record the group a user currently has open (best-effort)
    #[instrument(skip(self))]
    pub async fn record_open_group(&self, user_id: Snowflake, group_id: Snowflake) {
        if let Err(e) = self
            .ctx
            .group_store()
            .set_open_group(user_id, group_id)
            .await
        {
            warn!(
                user_id = %user_id,
                group_id = %group_id,
                error = %e,
                "Open-group write failed; navigation proceeds"
            );
        }
    }

    /// Record when a user last opened a group (best-effort)
    #[instrument(skip(self))]
    pub async fn record_last_opened(&self, user_id: Snowflake, group_id: Snowflake) {
        if let Err(e) = self
            .ctx
            .group_store()
            .set_last_opened(user_id, group_id, Utc::now())
            .await
        {
            warn!(
                user_id = %user_id,
                group_id = %group_id,
                error = %e,
                "Last-opened write failed; navigation proceeds"
            );
        }
    }

    /// Open a group: record both bookkeeping markers and return the route
    pub async fn open_group(&self, user_id: Snowflake, group_id: Snowflake) -> Route {
        self.record_open_group(user_id, group_id).await;
        self.record_last_opened(user_id, group_id).await;
        Route::Group(group_id)
    }

    /// Create a group and immediately open it for its owner
    ///
    /// # Errors
    /// Returns an error when the creation itself fails; bookkeeping
    /// failures after a successful creation do not block the route.
    pub async fn create_and_open_group(
        &self,
        owner_id: Snowflake,
        initial_members: Vec<Snowflake>,
        is_private: bool,
    ) -> ServiceResult<Route> {
        let group = self
            .create_public_group(owner_id, initial_members, is_private)
            .await?;
        Ok(self.open_group(owner_id, group.id).await)
    }
}

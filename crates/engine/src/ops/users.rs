use sea_orm::{ActiveModelTrait, ActiveValue, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Principal, RegisterUserCmd, ResultEngine, Role, User, UserUpdate, users,
    util::{normalize_handle, normalize_required_name},
};

use super::{Engine, on_unique_violation};

impl Engine {
    /// Register a new member with role `regular` and no points.
    ///
    /// Registration happens at the counter, so a cashier is enough.
    pub async fn register_user(
        &self,
        cmd: RegisterUserCmd,
        principal: &Principal,
    ) -> ResultEngine<User> {
        principal.require(Role::Cashier, "register user")?;
        self.insert_user(&cmd.handle, &cmd.name, Role::Regular).await
    }

    /// Create a user with any role, bypassing the role policy.
    ///
    /// Reserved for operator tooling (first superuser, recovery).
    pub async fn bootstrap_user(&self, handle: &str, name: &str, role: Role) -> ResultEngine<User> {
        self.insert_user(handle, name, role).await
    }

    async fn insert_user(&self, handle: &str, name: &str, role: Role) -> ResultEngine<User> {
        let handle = normalize_handle(handle)?;
        let name = normalize_required_name(name, "user")?;
        let user = User::new(handle, name, role);
        let created = self
            .with_tx(|_engine, db_tx| {
                Box::pin(async move {
                    let exists = users::Entity::find()
                        .filter(users::Column::Handle.eq(user.handle.clone()))
                        .one(db_tx)
                        .await?
                        .is_some();
                    if exists {
                        return Err(EngineError::ExistingKey(user.handle));
                    }
                    let model: users::ActiveModel = (&user).into();
                    model.insert(db_tx).await.map_err(|err| {
                        on_unique_violation(err, EngineError::ExistingKey(user.handle.clone()))
                    })?;
                    Ok(user)
                })
            })
            .await?;
        tracing::info!(
            user_id = %created.id,
            handle = %created.handle,
            role = created.role.as_str(),
            "user created"
        );
        Ok(created)
    }

    /// Change a user's role and/or suspicious flag.
    ///
    /// - Only managers and superusers may change either field.
    /// - A manager may only hand out `regular` or `cashier`, and may not
    ///   touch users at manager level or above.
    /// - A suspicious user cannot be promoted to cashier. Flagging an existing
    ///   cashier is allowed: their purchases are then held for verification.
    pub async fn update_user(
        &self,
        user_id: Uuid,
        update: UserUpdate,
        principal: &Principal,
    ) -> ResultEngine<User> {
        principal.require(Role::Manager, "update user")?;
        if update.is_empty() {
            return Err(EngineError::Validation(
                "nothing to update".to_string(),
            ));
        }
        if let Some(role) = update.role
            && principal.role < Role::Superuser
            && role > Role::Cashier
        {
            return Err(EngineError::PermissionDenied(format!(
                "assigning role {} requires role superuser",
                role.as_str()
            )));
        }
        let principal = *principal;
        let updated = self
            .with_tx(|engine, db_tx| {
                Box::pin(async move {
                    let model = engine.require_user(db_tx, user_id).await?;
                    let current = User::try_from(model.clone())?;
                    if principal.role < Role::Superuser && current.role >= Role::Manager {
                        return Err(EngineError::PermissionDenied(format!(
                            "modifying a user with role {} requires role superuser",
                            current.role.as_str()
                        )));
                    }

                    let role = update.role.unwrap_or(current.role);
                    let suspicious = update.suspicious.unwrap_or(current.suspicious);
                    let promoted_to_cashier =
                        update.role == Some(Role::Cashier) && current.role != Role::Cashier;
                    if promoted_to_cashier && suspicious {
                        return Err(EngineError::Validation(
                            "a suspicious user cannot be a cashier".to_string(),
                        ));
                    }

                    let mut active: users::ActiveModel = model.into();
                    active.role = ActiveValue::Set(role.as_str().to_string());
                    active.suspicious = ActiveValue::Set(suspicious);
                    let saved = active.update(db_tx).await?;
                    User::try_from(saved)
                })
            })
            .await?;
        tracing::info!(
            user_id = %updated.id,
            role = updated.role.as_str(),
            suspicious = updated.suspicious,
            by = %principal.id,
            "user updated"
        );
        Ok(updated)
    }

    pub async fn user(&self, user_id: Uuid) -> ResultEngine<User> {
        self.store
            .bounded(async {
                let model = self.require_user(self.database(), user_id).await?;
                User::try_from(model)
            })
            .await
    }

    pub async fn user_by_handle(&self, handle: &str) -> ResultEngine<User> {
        let handle = normalize_handle(handle)?;
        self.store
            .bounded(async {
                let model = users::Entity::find()
                    .filter(users::Column::Handle.eq(handle.clone()))
                    .one(self.database())
                    .await?
                    .ok_or_else(|| EngineError::NotFound(format!("user {handle}")))?;
                User::try_from(model)
            })
            .await
    }
}

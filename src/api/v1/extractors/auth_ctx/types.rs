/*
 * Responsibility
 * - Handler から見える「認証済みコンテキスト」の型
 * - middleware が検証して request extensions に格納し、handler はこの型だけを受け取る
 *
 * Notes
 * - JWT の検証ロジックは middleware/services 側の責務
 * - grant が何を許可するかは handler/policy 側で決める (ここは値を運ぶだけ)
 */

/// 認証済みのリクエストに付与されるコンテキスト
///
/// - `user_id` は user identifier claim の値
/// - `grant` は grant claim の値 (single-claim mode では `None`)
/// - claim 名でも引ける (`get`)。claim 名は設定で変わるため固定しない
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthCtx {
    pub user_id: String,
    pub grant: Option<String>,
    user_id_claim: String,
    grant_claim: Option<String>,
}

impl AuthCtx {
    pub fn new(user_id_claim: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            grant: None,
            user_id_claim: user_id_claim.into(),
            grant_claim: None,
        }
    }

    pub fn with_grant(mut self, grant_claim: impl Into<String>, grant: impl Into<String>) -> Self {
        self.grant_claim = Some(grant_claim.into());
        self.grant = Some(grant.into());
        self
    }

    /// Look a value up by the claim name it was read from.
    pub fn get(&self, claim: &str) -> Option<&str> {
        if claim == self.user_id_claim {
            return Some(&self.user_id);
        }
        match (&self.grant_claim, &self.grant) {
            (Some(name), Some(grant)) if name == claim => Some(grant),
            _ => None,
        }
    }
}

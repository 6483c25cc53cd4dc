use serde_json::Value;

use crate::cards::BetDraft;
use crate::error::Result;
use crate::rest::ApiClient;
use crate::types::*;

impl ApiClient {
    // --- Wallet ---

    /// POST /wallet/signature - Exchange a signed challenge for a token.
    pub async fn validate_signature(
        &self,
        request: &SignatureRequest,
    ) -> Result<Envelope<SignatureValidation>> {
        self.post("/wallet/signature", request).await
    }

    /// GET /wallet/check/{address} - Whether the wallet is registered.
    pub async fn check_wallet(&self, address: &str) -> Result<WalletCheck> {
        self.get(&format!("/wallet/check/{address}"), &[]).await
    }

    /// GET /user - Profile of the authenticated user. Fails without a
    /// request when the client carries no token.
    pub async fn get_user(&self) -> Result<UserProfileResponse> {
        self.require_token()?;
        self.get("/user", &[]).await
    }

    // --- Odds: markets ---

    /// POST /odds/market - Create a market.
    pub async fn create_market(&self, market: &MarketInput) -> Result<Envelope<Market>> {
        self.post("/odds/market", market).await
    }

    /// GET /odds/market/{id} - A single market.
    pub async fn get_market(&self, market_id: u64) -> Result<Envelope<Market>> {
        self.get(&format!("/odds/market/{market_id}"), &[]).await
    }

    /// GET /odds/market - All markets.
    pub async fn get_markets(&self) -> Result<Envelope<Vec<Market>>> {
        self.get("/odds/market", &[]).await
    }

    /// PUT /odds/market/{id} - Update a market.
    pub async fn update_market(
        &self,
        market_id: u64,
        market: &MarketInput,
    ) -> Result<Envelope<Market>> {
        self.put(&format!("/odds/market/{market_id}"), market).await
    }

    /// DELETE /odds/market/{id} - Delete a market.
    pub async fn delete_market(&self, market_id: u64) -> Result<Value> {
        self.delete(&format!("/odds/market/{market_id}")).await
    }

    // --- Odds: options ---

    /// POST /odds/option - Create a market option.
    pub async fn create_option(&self, option: &OptionInput) -> Result<Envelope<MarketOption>> {
        self.post("/odds/option", option).await
    }

    /// GET /odds/option/{id} - A single option.
    pub async fn get_option(&self, option_id: u64) -> Result<Envelope<MarketOption>> {
        self.get(&format!("/odds/option/{option_id}"), &[]).await
    }

    /// GET /odds/market/{id}/options - Options of a market.
    pub async fn get_market_options(&self, market_id: u64) -> Result<Envelope<Vec<MarketOption>>> {
        self.get(&format!("/odds/market/{market_id}/options"), &[])
            .await
    }

    /// PUT /odds/option/{id} - Update an option.
    pub async fn update_option(
        &self,
        option_id: u64,
        option: &OptionInput,
    ) -> Result<Envelope<MarketOption>> {
        self.put(&format!("/odds/option/{option_id}"), option).await
    }

    /// DELETE /odds/option/{id} - Delete an option.
    pub async fn delete_option(&self, option_id: u64) -> Result<Value> {
        self.delete(&format!("/odds/option/{option_id}")).await
    }

    // --- User bets ---

    /// POST /user-bet - Place a bet.
    pub async fn place_bet(&self, draft: &BetDraft) -> Result<Envelope<UserBet>> {
        self.post("/user-bet", draft).await
    }

    /// GET /user-bet/{id} - A single bet.
    pub async fn get_bet(&self, bet_id: &str) -> Result<Envelope<UserBet>> {
        self.get(&format!("/user-bet/{bet_id}"), &[]).await
    }

    /// GET /user-bet/my-bets - Bets of the authenticated user.
    pub async fn get_my_bets(&self, page: Pagination) -> Result<Envelope<Vec<UserBet>>> {
        let limit = page.limit.to_string();
        let offset = page.offset.to_string();
        self.get(
            "/user-bet/my-bets",
            &[("limit", limit.as_str()), ("offset", offset.as_str())],
        )
        .await
    }

    /// GET /user-bet/my-stats - Bet aggregates of the authenticated user.
    pub async fn get_my_bet_stats(&self) -> Result<Envelope<BetStats>> {
        self.get("/user-bet/my-stats", &[]).await
    }

    /// GET /user-bet/match/{id}/bets - Bets placed on a match.
    pub async fn get_match_bets(
        &self,
        match_id: u64,
        page: Pagination,
    ) -> Result<Envelope<Vec<UserBet>>> {
        let limit = page.limit.to_string();
        let offset = page.offset.to_string();
        self.get(
            &format!("/user-bet/match/{match_id}/bets"),
            &[("limit", limit.as_str()), ("offset", offset.as_str())],
        )
        .await
    }

    /// PUT /user-bet/{id} - Update a pending bet.
    pub async fn update_bet(&self, bet_id: &str, draft: &BetDraft) -> Result<Envelope<UserBet>> {
        self.put(&format!("/user-bet/{bet_id}"), draft).await
    }

    /// POST /user-bet/{id}/cancel - Cancel a bet.
    pub async fn cancel_bet(&self, bet_id: &str, reason: &str) -> Result<Envelope<UserBet>> {
        let body = CancelBet {
            reason: reason.to_string(),
        };
        self.post(&format!("/user-bet/{bet_id}/cancel"), &body)
            .await
    }

    /// DELETE /user-bet/{id} - Delete a bet.
    pub async fn delete_bet(&self, bet_id: &str) -> Result<Value> {
        self.delete(&format!("/user-bet/{bet_id}")).await
    }

    /// GET /user-bet/{id}/history - Status history of a bet.
    pub async fn get_bet_history(&self, bet_id: &str) -> Result<Envelope<Vec<Value>>> {
        self.get(&format!("/user-bet/{bet_id}/history"), &[])
            .await
    }

    // --- Chips ---

    /// GET /chips/balance - Chip balance of the authenticated user.
    pub async fn get_chip_balance(&self) -> Result<ChipBalance> {
        self.get::<Envelope<ChipBalance>>("/chips/balance", &[])
            .await
            .map(Envelope::into_content)
    }

    /// GET /chips/transactions - Chip transactions, newest first.
    pub async fn get_chip_transactions(&self, page: Pagination) -> Result<Vec<ChipTransaction>> {
        let limit = page.limit.to_string();
        let offset = page.offset.to_string();
        self.get::<Envelope<Vec<ChipTransaction>>>(
            "/chips/transactions",
            &[("limit", limit.as_str()), ("offset", offset.as_str())],
        )
        .await
        .map(Envelope::into_content)
    }

    /// GET /chips/stats - Chip aggregates of the authenticated user.
    pub async fn get_chip_stats(&self) -> Result<ChipStats> {
        self.get::<Envelope<ChipStats>>("/chips/stats", &[])
            .await
            .map(Envelope::into_content)
    }

    /// GET /chips/transaction/{id} - A single transaction.
    pub async fn get_chip_transaction(&self, transaction_id: &str) -> Result<ChipTransaction> {
        self.get::<Envelope<ChipTransaction>>(&format!("/chips/transaction/{transaction_id}"), &[])
            .await
            .map(Envelope::into_content)
    }

    /// GET /chips/transactions/type/{type} - Transactions of one kind.
    pub async fn get_chip_transactions_by_type(
        &self,
        kind: &str,
        page: Pagination,
    ) -> Result<Vec<ChipTransaction>> {
        let limit = page.limit.to_string();
        let offset = page.offset.to_string();
        self.get::<Envelope<Vec<ChipTransaction>>>(
            &format!("/chips/transactions/type/{kind}"),
            &[("limit", limit.as_str()), ("offset", offset.as_str())],
        )
        .await
        .map(Envelope::into_content)
    }

    /// GET /chips/transactions/reference/{type}/{id} - Transactions tied to
    /// a bet, purchase or other reference.
    pub async fn get_chip_transactions_by_reference(
        &self,
        reference_type: &str,
        reference_id: &str,
    ) -> Result<Vec<ChipTransaction>> {
        self.get::<Envelope<Vec<ChipTransaction>>>(
            &format!("/chips/transactions/reference/{reference_type}/{reference_id}"),
            &[],
        )
        .await
        .map(Envelope::into_content)
    }
}

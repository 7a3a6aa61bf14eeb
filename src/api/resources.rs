//! Typed catalog, tenant, subscription and billing endpoints.
//!
//! The DTOs are plain transfer shapes; the API gateway owns their lifecycle.

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::client::{ApiClient, ApiError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActiveStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub status: ActiveStatus,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    Monthly,
    Yearly,
    Lifetime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductPlan {
    pub id: String,
    pub product_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub billing_cycle: BillingCycle,
    #[serde(default)]
    pub features: Vec<String>,
    pub status: ActiveStatus,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Inactive,
    Cancelled,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TenantSubscription {
    pub id: String,
    pub tenant_id: String,
    pub product_id: String,
    pub plan_id: String,
    pub status: SubscriptionStatus,
    pub start_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub email: String,
    pub status: ActiveStatus,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscriptions: Option<Vec<TenantSubscription>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub status: ActiveStatus,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Paid,
    Pending,
    Overdue,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    pub tenant_id: String,
    pub subscription_id: String,
    pub currency: String,
    pub amount: f64,
    pub status: InvoiceStatus,
    pub due_date: String,
    pub issue_date: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Completed,
    Pending,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub tenant_id: String,
    pub subscription_id: String,
    pub amount: f64,
    pub currency: String,
    pub status: TransactionStatus,
    pub payment_method: String,
    pub transaction_date: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<String>,
}

/// A CRUD collection on the API gateway.
pub trait Resource: Send + Sync + 'static {
    /// Gateway path of the collection.
    const PATH: &'static str;
    /// The gateway lists this collection with `POST {PATH}` and a filter body.
    const LIST_WITH_FILTER: bool;

    type Item: Serialize + DeserializeOwned + Send + 'static;
}

pub struct Products;
pub struct Tenants;
pub struct Subscriptions;
pub struct Billing;

impl Resource for Products {
    const PATH: &'static str = "/api/products";
    const LIST_WITH_FILTER: bool = true;
    type Item = Product;
}

impl Resource for Tenants {
    const PATH: &'static str = "/api/tenants";
    const LIST_WITH_FILTER: bool = true;
    type Item = Tenant;
}

impl Resource for Subscriptions {
    const PATH: &'static str = "/api/subscription";
    const LIST_WITH_FILTER: bool = false;
    type Item = Subscription;
}

impl Resource for Billing {
    const PATH: &'static str = "/api/billing";
    const LIST_WITH_FILTER: bool = false;
    type Item = Invoice;
}

/// One resource collection bound to a caller's token and cancellation.
pub struct ResourceApi<'a, R: Resource> {
    client: &'a ApiClient,
    bearer: Option<&'a str>,
    cancel: &'a CancellationToken,
    _resource: std::marker::PhantomData<R>,
}

impl ApiClient {
    pub fn resource<'a, R: Resource>(
        &'a self,
        bearer: Option<&'a str>,
        cancel: &'a CancellationToken,
    ) -> ResourceApi<'a, R> {
        ResourceApi {
            client: self,
            bearer,
            cancel,
            _resource: std::marker::PhantomData,
        }
    }
}

impl<R: Resource> ResourceApi<'_, R> {
    pub async fn list(&self, filter: Option<&Value>) -> Result<Vec<R::Item>, ApiError> {
        if R::LIST_WITH_FILTER {
            let empty = Value::Object(Default::default());
            let body = filter.unwrap_or(&empty);
            self.client
                .request(Method::POST, R::PATH, self.bearer, Some(body), self.cancel)
                .await
        } else {
            self.client
                .request(Method::GET, R::PATH, self.bearer, None, self.cancel)
                .await
        }
    }

    pub async fn get(&self, id: &str) -> Result<R::Item, ApiError> {
        self.client
            .request(Method::GET, &item_path::<R>(id), self.bearer, None, self.cancel)
            .await
    }

    pub async fn create(&self, data: &Value) -> Result<R::Item, ApiError> {
        self.client
            .request(Method::POST, R::PATH, self.bearer, Some(data), self.cancel)
            .await
    }

    pub async fn update(&self, id: &str, data: &Value) -> Result<R::Item, ApiError> {
        self.client
            .request(Method::PATCH, &item_path::<R>(id), self.bearer, Some(data), self.cancel)
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .request_empty(Method::DELETE, &item_path::<R>(id), self.bearer, None, self.cancel)
            .await
    }
}

fn item_path<R: Resource>(id: &str) -> String {
    format!("{}/{}", R::PATH, urlencoding::encode(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn product_json(id: &str) -> Value {
        serde_json::json!({
            "id": id,
            "name": "Analytics Pro",
            "description": "Dashboards",
            "price": 49.0,
            "status": "active",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-02-01T00:00:00Z"
        })
    }

    #[test]
    fn test_item_path_encodes_id() {
        assert_eq!(item_path::<Billing>("inv 1/2"), "/api/billing/inv%201%2F2");
        assert_eq!(item_path::<Subscriptions>("s1"), "/api/subscription/s1");
    }

    #[test]
    fn test_invoice_camel_case() {
        let invoice: Invoice = serde_json::from_value(serde_json::json!({
            "id": "inv-1",
            "tenantId": "t-1",
            "subscriptionId": "s-1",
            "currency": "USD",
            "amount": 120.5,
            "status": "overdue",
            "dueDate": "2024-03-01",
            "issueDate": "2024-02-01",
            "createdAt": "2024-02-01"
        }))
        .unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Overdue);
        assert_eq!(invoice.tenant_id, "t-1");
        assert!(invoice.updated_at.is_none());
    }

    #[test]
    fn test_unknown_status_rejected() {
        let mut json = product_json("p1");
        json["status"] = serde_json::json!("archived");
        assert!(serde_json::from_value::<Product>(json).is_err());
    }

    #[test]
    fn test_transaction_and_plan_shapes() {
        let tx: Transaction = serde_json::from_value(serde_json::json!({
            "id": "tx-1",
            "tenantId": "t-1",
            "subscriptionId": "s-1",
            "amount": 10.0,
            "currency": "EUR",
            "status": "refunded",
            "paymentMethod": "card",
            "transactionDate": "2024-01-05"
        }))
        .unwrap();
        assert_eq!(tx.status, TransactionStatus::Refunded);
        assert!(tx.invoice_id.is_none());

        let plan: ProductPlan = serde_json::from_value(serde_json::json!({
            "id": "pl-1",
            "productId": "p-1",
            "name": "Team",
            "price": 99.0,
            "billingCycle": "yearly",
            "features": ["sso"],
            "status": "inactive",
            "createdAt": "2024-01-01"
        }))
        .unwrap();
        assert_eq!(plan.billing_cycle, BillingCycle::Yearly);
        assert_eq!(plan.status, ActiveStatus::Inactive);
    }

    #[tokio::test]
    async fn test_products_list_posts_empty_filter() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/products"))
            .and(body_json(serde_json::json!({})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!([product_json("p1")])),
            )
            .mount(&server)
            .await;

        let client = ApiClient::new(reqwest::Client::new(), server.uri());
        let cancel = CancellationToken::new();
        let products = client.resource::<Products>(None, &cancel).list(None).await.unwrap();

        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Analytics Pro");
    }

    #[tokio::test]
    async fn test_subscriptions_list_uses_get() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/subscription"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                "id": "s1",
                "name": "Starter",
                "price": 9.0,
                "status": "active",
                "createdAt": "2024-01-01"
            }])))
            .mount(&server)
            .await;

        let client = ApiClient::new(reqwest::Client::new(), server.uri());
        let cancel = CancellationToken::new();
        let subs = client
            .resource::<Subscriptions>(Some("at"), &cancel)
            .list(Some(&serde_json::json!({"ignored": true})))
            .await
            .unwrap();
        assert_eq!(subs[0].id, "s1");
    }

    #[tokio::test]
    async fn test_tenant_update_patches_item() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/tenants/t-9"))
            .and(body_json(serde_json::json!({"status": "inactive"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "t-9",
                "name": "Acme",
                "email": "ops@acme.test",
                "status": "inactive",
                "createdAt": "2024-01-01"
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(reqwest::Client::new(), server.uri());
        let cancel = CancellationToken::new();
        let tenant = client
            .resource::<Tenants>(Some("at"), &cancel)
            .update("t-9", &serde_json::json!({"status": "inactive"}))
            .await
            .unwrap();
        assert_eq!(tenant.status, ActiveStatus::Inactive);
    }
}

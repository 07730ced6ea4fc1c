// ==========================================
// 并发流转测试
// ==========================================
// 测试目标: 同一订单的并发发货请求不产生丢失更新；
//           改写恰好发生一次，其余请求观察到幂等跳过
// ==========================================


use order_flow::app::AppState;
use order_flow::domain::types::OrderStatus;
use order_flow::logging;
use std::sync::Arc;
use std::thread;

#[test]
fn test_concurrent_transitions_single_winner() {
    logging::init_test();

    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let conn = test_helpers::open_test_connection(&db_path).expect("Failed to open db");
    test_helpers::insert_test_config(&conn).expect("Failed to insert config");
    test_helpers::seed_order(&conn, 1, "Pending").expect("Failed to seed order");
    drop(conn);

    let app = Arc::new(AppState::new(db_path).expect("Failed to create AppState"));

    const WORKERS: usize = 8;
    let mut handles = Vec::with_capacity(WORKERS);
    for worker in 0..WORKERS {
        let app = app.clone();
        handles.push(thread::spawn(move || {
            app.order_api
                .transition_to_shipped(1, &format!("worker-{}", worker))
        }));
    }

    let outcomes: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("Worker thread panicked"))
        .collect();

    // 所有请求都应成功（后到的观察到幂等跳过）
    let changed_count = outcomes
        .iter()
        .map(|r| r.as_ref().expect("Transition should succeed"))
        .filter(|o| o.changed)
        .count();
    assert_eq!(changed_count, 1, "改写应恰好发生一次");

    // 最终状态为 Shipped
    let order = app.order_api.get_order(1).expect("Order should exist");
    assert_eq!(order.status, OrderStatus::Shipped);

    // 审计日志恰好一条
    let logs = app
        .order_api
        .list_transition_logs(1, 50)
        .expect("Query should succeed");
    assert_eq!(logs.len(), 1, "审计日志应恰好一条");
}

#[test]
fn test_concurrent_transitions_multiple_orders() {
    logging::init_test();

    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let conn = test_helpers::open_test_connection(&db_path).expect("Failed to open db");
    test_helpers::insert_test_config(&conn).expect("Failed to insert config");
    for order_id in 1..=4 {
        test_helpers::seed_order(&conn, order_id, "Processing").expect("Failed to seed order");
    }
    drop(conn);

    let app = Arc::new(AppState::new(db_path).expect("Failed to create AppState"));

    // 每个订单一个线程，订单间无需协调
    let handles: Vec<_> = (1..=4)
        .map(|order_id| {
            let app = app.clone();
            thread::spawn(move || app.order_api.transition_to_shipped(order_id, "worker"))
        })
        .collect();

    for handle in handles {
        let outcome = handle
            .join()
            .expect("Worker thread panicked")
            .expect("Transition should succeed");
        assert!(outcome.changed);
        assert_eq!(outcome.new_status, OrderStatus::Shipped);
    }

    let summary = app
        .order_api
        .get_status_summary()
        .expect("Query should succeed");
    assert!(summary.iter().any(|s| s.status == "Shipped" && s.count == 4));
}

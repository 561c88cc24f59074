//! End-to-end check throughput on the id-server program.

use criterion::{criterion_group, criterion_main, Criterion};
use patc::{check, CheckOptions};
use std::hint::black_box;

const ID_SERVER: &str = r#"interface IdServer { Get(IdClient!) }
interface IdClient { Id(Int) }

def id_server(self: IdServer?, next: Int): Unit {
    guard self: *Get {
        free -> ()
        receive Get(client) from self ->
            client ! Id(next);
            id_server(self, next + 1)
    }
}

def id_client(serverMb: IdServer!): Int {
    let clientMb = new [IdClient] in
    serverMb ! Get(clientMb);
    guard clientMb: Id {
        receive Id(id) from clientMb ->
            free(clientMb);
            id
    }
}

def main(): Unit {
    let idServerMb = new [IdServer] in
    spawn {id_server(idServerMb, 0)};
    print(intToString(id_client(idServerMb)))
}
"#;

fn bench_check(c: &mut Criterion) {
    let options = CheckOptions::default();
    c.bench_function("check_id_server", |b| {
        b.iter(|| check(black_box(ID_SERVER), &options));
    });
}

criterion_group!(benches, bench_check);
criterion_main!(benches);

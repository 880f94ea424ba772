use rsh::Interpreter;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    Interpreter::default().repl()
}
